use super::form::{lenient_flag, lenient_text, required};
use crate::backend::AccessScope;
use crate::envelope::{Reply, fields};
use crate::rows::{SheetGrid, sheet_range};
use crate::state::AppState;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const OPERATION: &str = "get";

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ReadRowsParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sheet_name: Option<String>,
    /// A1 range inside the sheet, e.g. `A1:D20`. Blank reads the whole sheet.
    #[serde(default, deserialize_with = "lenient_text")]
    pub range: Option<String>,
    /// Keep the first returned row (default true).
    #[serde(default, deserialize_with = "lenient_flag")]
    pub include_headers: Option<bool>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReadRowsResponse {
    pub rows: SheetGrid,
    pub row_count: usize,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub range: String,
}

impl Reply for ReadRowsResponse {
    fn metadata(&self) -> Map<String, Value> {
        fields([
            ("spreadsheet_id", Value::from(self.spreadsheet_id.as_str())),
            ("sheet_name", Value::from(self.sheet_name.as_str())),
            ("range", Value::from(self.range.as_str())),
            ("row_count", Value::from(self.row_count)),
        ])
    }
}

pub async fn read_rows(state: Arc<AppState>, params: ReadRowsParams) -> Result<ReadRowsResponse> {
    let spreadsheet_id = required(
        &params.spreadsheet_id,
        OPERATION,
        "spreadsheet_id",
        "Spreadsheet ID is required",
    )?
    .to_string();
    let sheet_name = required(
        &params.sheet_name,
        OPERATION,
        "sheet_name",
        "Sheet name is required",
    )?
    .to_string();
    let include_headers = params.include_headers.unwrap_or(true);
    let range = sheet_range(&sheet_name, params.range.as_deref());

    tracing::info!(
        operation = OPERATION,
        %spreadsheet_id,
        %sheet_name,
        %range,
        "reading rows"
    );

    let backend = state
        .connect(AccessScope::ReadOnly)
        .await
        .context("Failed to create Google Sheets service")?;
    let mut rows = backend
        .get_values(&spreadsheet_id, &range)
        .await
        .context("Failed to read data from Google Sheet")?;

    if !include_headers && !rows.is_empty() {
        rows.remove(0);
    }

    tracing::info!(rows = rows.len(), "rows read");
    Ok(ReadRowsResponse {
        row_count: rows.len(),
        rows,
        spreadsheet_id,
        sheet_name,
        range,
    })
}
