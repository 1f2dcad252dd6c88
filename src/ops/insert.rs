use super::form::{lenient_flag, lenient_text, required};
use crate::backend::{AccessScope, ValueInputOption};
use crate::envelope::{Reply, fields};
use crate::errors::ValidationError;
use crate::rows::{RawPayload, Record, normalize_objects, project_record, sheet_range};
use crate::state::AppState;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const OPERATION: &str = "insert";

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct InsertRowsParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sheet_name: Option<String>,
    /// JSON array of objects; the first object's keys become the columns.
    #[serde(default)]
    pub data_to_insert: Option<RawPayload>,
    /// Write the column names as a row before the data (default false).
    #[serde(default, deserialize_with = "lenient_flag")]
    pub include_headers: Option<bool>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct InsertRowsResponse {
    pub message: String,
    pub updated_range: String,
    pub inserted_data: Vec<Record>,
    #[serde(skip)]
    spreadsheet_id: String,
    #[serde(skip)]
    sheet_name: String,
    #[serde(skip)]
    rows_inserted: usize,
}

impl Reply for InsertRowsResponse {
    fn metadata(&self) -> Map<String, Value> {
        fields([
            ("spreadsheet_id", Value::from(self.spreadsheet_id.as_str())),
            ("sheet_name", Value::from(self.sheet_name.as_str())),
            ("rows_inserted", Value::from(self.rows_inserted)),
        ])
    }
}

/// Column order comes from the first record; later records are projected onto it.
fn layout(records: &[Record], include_headers: bool) -> Vec<Vec<Value>> {
    let headers: Vec<String> = records
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(records.len() + 1);
    if include_headers {
        rows.push(headers.iter().cloned().map(Value::String).collect());
    }
    rows.extend(records.iter().map(|record| project_record(record, &headers)));
    rows
}

pub async fn insert_rows(
    state: Arc<AppState>,
    params: InsertRowsParams,
) -> Result<InsertRowsResponse> {
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
    let raw = params
        .data_to_insert
        .filter(|raw| !raw.is_blank())
        .unwrap_or_else(|| RawPayload::List(Vec::new()));
    let records = normalize_objects(raw).context(
        "Invalid format for 'data_to_insert'. Please enter a valid JSON array of objects",
    )?;
    if records.is_empty() {
        return Err(ValidationError::new(OPERATION, "Parsed data_to_insert is empty")
            .with_field("data_to_insert")
            .into());
    }

    let values = layout(&records, params.include_headers.unwrap_or(false));
    let range = sheet_range(&sheet_name, Some("A1"));
    tracing::info!(
        operation = OPERATION,
        %spreadsheet_id,
        %sheet_name,
        records = records.len(),
        "inserting rows"
    );

    let backend = state
        .connect(AccessScope::ReadWrite)
        .await
        .context("Failed to create Google Sheets service")?;
    let outcome = backend
        .append_values(&spreadsheet_id, &range, &values, ValueInputOption::Raw)
        .await
        .context("Failed to insert data into Google Sheet")?;

    tracing::info!(range = %outcome.updated_range, rows = records.len(), "rows inserted");
    Ok(InsertRowsResponse {
        message: format!("Successfully appended {} rows", records.len()),
        updated_range: outcome.updated_range,
        rows_inserted: records.len(),
        inserted_data: records,
        spreadsheet_id,
        sheet_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        normalize_objects(RawPayload::from(value)).unwrap()
    }

    #[test]
    fn later_records_follow_first_record_columns() {
        let rows = layout(
            &records(json!([
                {"name": "Ada", "id": 1},
                {"id": 2, "extra": "dropped"}
            ])),
            false,
        );
        assert_eq!(
            rows,
            vec![vec![json!("Ada"), json!(1)], vec![json!(""), json!(2)]]
        );
    }

    #[test]
    fn header_row_is_optional() {
        let rows = layout(&records(json!([{"a": 1, "b": 2}])), true);
        assert_eq!(rows[0], vec![json!("a"), json!("b")]);
        assert_eq!(rows.len(), 2);
    }
}
