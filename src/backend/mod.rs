use crate::errors::BackendError;
use crate::rows::{RowDeletion, SheetGrid};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub mod credentials;
pub mod google;
pub mod memory;

pub use credentials::{CredentialSource, ServiceAccount};
pub use google::{GoogleBackendProvider, GoogleSheetsBackend};
pub use memory::{BackendCall, InMemoryBackend, InMemoryProvider};

const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const SPREADSHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    ReadOnly,
    ReadWrite,
}

impl AccessScope {
    pub fn oauth_scope(self) -> &'static str {
        match self {
            Self::ReadOnly => SPREADSHEETS_READONLY_SCOPE,
            Self::ReadWrite => SPREADSHEETS_SCOPE,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    #[default]
    Raw,
    UserEntered,
}

impl ValueInputOption {
    pub const VARIANTS: [&'static str; 2] = ["RAW", "USER_ENTERED"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

/// Properties of one tab, as reported by spreadsheet metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Rows,
    Columns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: i64,
    pub dimension: Dimension,
    pub start_index: u32,
    pub end_index: u32,
}

/// One entry of a `spreadsheets:batchUpdate` request list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchRequest {
    DeleteDimension { range: DimensionRange },
}

impl BatchRequest {
    pub fn delete_rows(sheet_id: i64, deletion: &RowDeletion) -> Self {
        Self::DeleteDimension {
            range: DimensionRange {
                sheet_id,
                dimension: Dimension::Rows,
                start_index: deletion.start_index,
                end_index: deletion.end_index,
            },
        }
    }
}

/// What a value write reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub updated_range: String,
    pub updated_rows: usize,
    pub updated_columns: usize,
}

/// The only component that talks to the spreadsheet store.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    async fn get_metadata(&self, spreadsheet_id: &str)
    -> Result<Vec<SheetProperties>, BackendError>;

    async fn get_values(&self, spreadsheet_id: &str, range: &str)
    -> Result<SheetGrid, BackendError>;

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        option: ValueInputOption,
    ) -> Result<WriteOutcome, BackendError>;

    /// Append below the table found in `range`, inserting new rows.
    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        option: ValueInputOption,
    ) -> Result<WriteOutcome, BackendError>;

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: &[BatchRequest],
    ) -> Result<(), BackendError>;
}

/// Hands out a freshly credentialed backend for each request.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn connect(&self, scope: AccessScope) -> Result<Arc<dyn SheetsBackend>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delete_request_matches_batch_update_shape() {
        let request = BatchRequest::delete_rows(42, &RowDeletion::for_row(5));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "deleteDimension": {
                    "range": {
                        "sheetId": 42,
                        "dimension": "ROWS",
                        "startIndex": 4,
                        "endIndex": 5
                    }
                }
            })
        );
    }

    #[test]
    fn value_input_option_parses_api_names() {
        assert_eq!(
            "USER_ENTERED".parse::<ValueInputOption>().unwrap(),
            ValueInputOption::UserEntered
        );
        assert_eq!(ValueInputOption::Raw.to_string(), "RAW");
        assert!("raw ".parse::<ValueInputOption>().is_err());
    }
}
