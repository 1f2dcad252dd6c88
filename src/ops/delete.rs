use super::form::{lenient_flag, lenient_text, required};
use crate::backend::{AccessScope, BatchRequest, SheetsBackend};
use crate::envelope::{Reply, fields};
use crate::errors::{BackendError, ConfirmationRequired};
use crate::rows::{DeletionPlan, RowSelector};
use crate::state::AppState;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const OPERATION: &str = "delete";

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DeleteRowsParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sheet_name: Option<String>,
    /// Rows to delete, e.g. `5`, `5-10` or `5,7,10-12`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub row_numbers: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub confirm_deletion: Option<bool>,
}

#[derive(Debug)]
struct DeleteRequest {
    spreadsheet_id: String,
    sheet_name: String,
    rows: RowSelector,
}

impl DeleteRowsParams {
    fn validate(self) -> Result<DeleteRequest> {
        let spreadsheet_id = required(
            &self.spreadsheet_id,
            OPERATION,
            "spreadsheet_id",
            "Spreadsheet ID is required",
        )?
        .to_string();
        let sheet_name =
            required(&self.sheet_name, OPERATION, "sheet_name", "Sheet name is required")?
                .to_string();
        let row_numbers = required(
            &self.row_numbers,
            OPERATION,
            "row_numbers",
            "Row numbers are required",
        )?;
        if !self.confirm_deletion.unwrap_or(false) {
            return Err(ConfirmationRequired::new("deletion", "confirm_deletion").into());
        }
        let rows = RowSelector::parse(row_numbers).context("Invalid row numbers format")?;

        Ok(DeleteRequest {
            spreadsheet_id,
            sheet_name,
            rows,
        })
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DeleteRowsResponse {
    pub message: String,
    pub deleted_rows: Vec<u32>,
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl Reply for DeleteRowsResponse {
    fn metadata(&self) -> Map<String, Value> {
        fields([
            ("spreadsheet_id", Value::from(self.spreadsheet_id.as_str())),
            ("sheet_name", Value::from(self.sheet_name.as_str())),
            ("deleted_rows_count", Value::from(self.deleted_rows.len())),
        ])
    }
}

pub async fn delete_rows(
    state: Arc<AppState>,
    params: DeleteRowsParams,
) -> Result<DeleteRowsResponse> {
    let request = params.validate()?;
    tracing::info!(
        operation = OPERATION,
        spreadsheet_id = %request.spreadsheet_id,
        sheet_name = %request.sheet_name,
        rows = %request.rows,
        "deleting rows"
    );

    let backend = state
        .connect(AccessScope::ReadWrite)
        .await
        .context("Failed to create Google Sheets service")?;
    apply_deletion(backend.as_ref(), &request)
        .await
        .context("Failed to delete rows from Google Sheet")?;

    let deleted_rows = request.rows.to_vec();
    tracing::info!(deleted = deleted_rows.len(), "rows deleted");
    Ok(DeleteRowsResponse {
        message: format!("Successfully deleted {} rows", deleted_rows.len()),
        deleted_rows,
        spreadsheet_id: request.spreadsheet_id,
        sheet_name: request.sheet_name,
    })
}

async fn apply_deletion(
    backend: &dyn SheetsBackend,
    request: &DeleteRequest,
) -> Result<(), BackendError> {
    let sheets = backend.get_metadata(&request.spreadsheet_id).await?;
    let sheet_id = sheets
        .iter()
        .find(|sheet| sheet.title == request.sheet_name)
        .map(|sheet| sheet.sheet_id)
        .ok_or_else(|| {
            BackendError::not_found(format!(
                "Sheet '{}' not found in spreadsheet",
                request.sheet_name
            ))
        })?;

    // Descending, so each deletion leaves the rows still to be deleted in place.
    let requests: Vec<BatchRequest> = DeletionPlan::for_selector(&request.rows)
        .deletions()
        .iter()
        .map(|deletion| BatchRequest::delete_rows(sheet_id, deletion))
        .collect();
    backend
        .batch_update(&request.spreadsheet_id, &requests)
        .await
}

