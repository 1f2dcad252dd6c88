use super::form::{lenient_flag, lenient_text, required};
use crate::backend::{AccessScope, ValueInputOption};
use crate::envelope::{Reply, fields};
use crate::errors::{ConfirmationRequired, ValidationError};
use crate::rows::{RawPayload, ValueGrid, normalize_grid, sheet_range};
use crate::state::AppState;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const OPERATION: &str = "update";

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateCellsParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sheet_name: Option<String>,
    /// Top-left anchor or full A1 range. Blank starts at the sheet's first cell.
    #[serde(default, deserialize_with = "lenient_text")]
    pub range: Option<String>,
    /// A value, a list (one row) or a list of lists, as JSON.
    #[serde(default)]
    pub update_data: Option<RawPayload>,
    /// `RAW` (default) or `USER_ENTERED`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub value_input_option: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub confirm_update: Option<bool>,
}

#[derive(Debug)]
struct UpdateRequest {
    spreadsheet_id: String,
    sheet_name: String,
    range: String,
    grid: ValueGrid,
    option: ValueInputOption,
}

impl UpdateCellsParams {
    fn validate(self) -> Result<UpdateRequest> {
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
        let raw = match self.update_data {
            Some(raw) if !raw.is_blank() => raw,
            _ => {
                return Err(ValidationError::new(OPERATION, "Update data is required")
                    .with_field("update_data")
                    .into());
            }
        };
        if !self.confirm_update.unwrap_or(false) {
            return Err(ConfirmationRequired::new("update", "confirm_update").into());
        }
        let grid = normalize_grid(raw).context("Invalid update data format")?;

        let option = match self.value_input_option.as_deref().map(str::trim) {
            None | Some("") => ValueInputOption::default(),
            Some(text) => text.parse::<ValueInputOption>().map_err(|_| {
                ValidationError::new(
                    OPERATION,
                    format!(
                        "Invalid value input option. Must be one of: {}",
                        ValueInputOption::VARIANTS.join(", ")
                    ),
                )
                .with_field("value_input_option")
            })?,
        };

        let range = sheet_range(&sheet_name, self.range.as_deref());
        Ok(UpdateRequest {
            spreadsheet_id,
            sheet_name,
            range,
            grid,
            option,
        })
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UpdateCellsResponse {
    pub message: String,
    pub updated_range: String,
    pub updated_rows: usize,
    pub updated_columns: usize,
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl Reply for UpdateCellsResponse {
    fn metadata(&self) -> Map<String, Value> {
        fields([
            ("spreadsheet_id", Value::from(self.spreadsheet_id.as_str())),
            ("sheet_name", Value::from(self.sheet_name.as_str())),
            ("updated_rows_count", Value::from(self.updated_rows)),
            ("updated_columns_count", Value::from(self.updated_columns)),
        ])
    }
}

pub async fn update_cells(
    state: Arc<AppState>,
    params: UpdateCellsParams,
) -> Result<UpdateCellsResponse> {
    let request = params.validate()?;
    tracing::info!(
        operation = OPERATION,
        spreadsheet_id = %request.spreadsheet_id,
        range = %request.range,
        option = %request.option,
        rows = request.grid.len(),
        "updating cells"
    );

    let backend = state
        .connect(AccessScope::ReadWrite)
        .await
        .context("Failed to create Google Sheets service")?;
    let outcome = backend
        .update_values(
            &request.spreadsheet_id,
            &request.range,
            &request.grid,
            request.option,
        )
        .await
        .context("Failed to update data in Google Sheet")?;

    tracing::info!(
        range = %outcome.updated_range,
        updated_rows = outcome.updated_rows,
        "cells updated"
    );
    Ok(UpdateCellsResponse {
        message: "Successfully updated data".to_string(),
        updated_range: outcome.updated_range,
        updated_rows: outcome.updated_rows,
        updated_columns: outcome.updated_columns,
        spreadsheet_id: request.spreadsheet_id,
        sheet_name: request.sheet_name,
    })
}
