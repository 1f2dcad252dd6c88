use super::form::{lenient_flag, lenient_text, required};
use crate::backend::{AccessScope, SheetsBackend, ValueInputOption};
use crate::envelope::{Reply, fields};
use crate::errors::{ConfirmationRequired, ValidationError};
use crate::rows::{
    KeyIndex, RawPayload, Record, UpsertPlan, UpsertSummary, normalize_objects, record_keys,
    sheet_range,
};
use crate::state::AppState;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const OPERATION: &str = "upsert";

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpsertRowsParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sheet_name: Option<String>,
    /// Header of the column whose values identify a row.
    #[serde(default, deserialize_with = "lenient_text")]
    pub key_column: Option<String>,
    /// JSON array of objects, each carrying the key column.
    #[serde(default)]
    pub data_to_upsert: Option<RawPayload>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub confirm_upsert: Option<bool>,
}

#[derive(Debug)]
struct UpsertRequest {
    spreadsheet_id: String,
    sheet_name: String,
    key_column: String,
    records: Vec<Record>,
}

impl UpsertRowsParams {
    fn validate(self) -> Result<UpsertRequest> {
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
        let key_column =
            required(&self.key_column, OPERATION, "key_column", "Key column is required")?
                .to_string();
        let raw = match self.data_to_upsert {
            Some(raw) if !raw.is_blank() => raw,
            _ => {
                return Err(ValidationError::new(OPERATION, "Data to upsert is required")
                    .with_field("data_to_upsert")
                    .into());
            }
        };
        if !self.confirm_upsert.unwrap_or(false) {
            return Err(ConfirmationRequired::new("upsert", "confirm_upsert").into());
        }
        let records = normalize_objects(raw).context("Invalid data to upsert")?;
        record_keys(&records, &key_column)?;

        Ok(UpsertRequest {
            spreadsheet_id,
            sheet_name,
            key_column,
            records,
        })
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UpsertRowsResponse {
    pub message: String,
    pub updated: usize,
    pub inserted: usize,
    pub total: usize,
    #[serde(skip)]
    spreadsheet_id: String,
    #[serde(skip)]
    sheet_name: String,
}

impl Reply for UpsertRowsResponse {
    fn metadata(&self) -> Map<String, Value> {
        fields([
            ("spreadsheet_id", Value::from(self.spreadsheet_id.as_str())),
            ("sheet_name", Value::from(self.sheet_name.as_str())),
            ("updated", Value::from(self.updated)),
            ("inserted", Value::from(self.inserted)),
        ])
    }
}

pub async fn upsert_rows(
    state: Arc<AppState>,
    params: UpsertRowsParams,
) -> Result<UpsertRowsResponse> {
    let request = params.validate()?;
    tracing::info!(
        operation = OPERATION,
        spreadsheet_id = %request.spreadsheet_id,
        sheet_name = %request.sheet_name,
        key_column = %request.key_column,
        records = request.records.len(),
        "upserting rows"
    );

    let backend = state
        .connect(AccessScope::ReadWrite)
        .await
        .context("Failed to create Google Sheets service")?;
    let summary = apply_upsert(backend.as_ref(), &request)
        .await
        .context("Failed to upsert rows in Google Sheet")?;

    tracing::info!(
        updated = summary.updated,
        inserted = summary.inserted,
        "upsert complete"
    );
    Ok(UpsertRowsResponse {
        message: format!(
            "Upsert complete: {} updated, {} inserted.",
            summary.updated, summary.inserted
        ),
        updated: summary.updated,
        inserted: summary.inserted,
        total: summary.total,
        spreadsheet_id: request.spreadsheet_id,
        sheet_name: request.sheet_name,
    })
}

/// One full read, then every in-place update in input order, then one append.
async fn apply_upsert(backend: &dyn SheetsBackend, request: &UpsertRequest) -> Result<UpsertSummary> {
    let whole_sheet = sheet_range(&request.sheet_name, None);
    let grid = backend
        .get_values(&request.spreadsheet_id, &whole_sheet)
        .await?;
    let index = KeyIndex::build(&grid, &request.key_column)?;
    let headers = grid.first().cloned().unwrap_or_default();

    let plan = UpsertPlan::reconcile(
        &request.sheet_name,
        &headers,
        &index,
        &request.records,
        &request.key_column,
    )?;
    tracing::debug!(
        indexed_keys = index.len(),
        updates = plan.updates.len(),
        appends = plan.appends.len(),
        "upsert plan"
    );

    for update in &plan.updates {
        backend
            .update_values(
                &request.spreadsheet_id,
                &update.range,
                std::slice::from_ref(&update.values),
                ValueInputOption::Raw,
            )
            .await?;
    }
    if !plan.appends.is_empty() {
        backend
            .append_values(
                &request.spreadsheet_id,
                &whole_sheet,
                &plan.appends,
                ValueInputOption::Raw,
            )
            .await?;
    }

    Ok(plan.summary())
}
