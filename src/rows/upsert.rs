use super::address::row_span;
use super::key_index::KeyIndex;
use super::payload::{Record, project_record, scalar_text};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpsertError {
    #[error(
        "Key column '{key_column}' is missing or blank in record(s) {}",
        format_positions(.positions)
    )]
    BlankKeys {
        key_column: String,
        positions: Vec<usize>,
    },
}

fn format_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|p| format!("#{p}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The trimmed key of every record, in order.
///
/// Every record whose key is missing, blank or not a scalar is reported at
/// once. Needs no sheet access, so it runs before any backend call.
pub fn record_keys(records: &[Record], key_column: &str) -> Result<Vec<String>, UpsertError> {
    let keys: Vec<Option<String>> = records
        .iter()
        .map(|record| {
            record
                .get(key_column)
                .and_then(scalar_text)
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
        .collect();

    let blanks: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| key.is_none())
        .map(|(idx, _)| idx + 1)
        .collect();
    if !blanks.is_empty() {
        return Err(UpsertError::BlankKeys {
            key_column: key_column.to_string(),
            positions: blanks,
        });
    }
    Ok(keys.into_iter().flatten().collect())
}

/// An in-place overwrite of one existing sheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowUpdate {
    pub range: String,
    pub row: u32,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub updated: usize,
    pub inserted: usize,
    pub total: usize,
}

/// Incoming records split into targeted row updates and new rows to append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertPlan {
    pub updates: Vec<RowUpdate>,
    pub appends: Vec<Vec<Value>>,
}

impl UpsertPlan {
    /// Match each record's key against `index`.
    ///
    /// Known keys become a single-row update spanning column A through the last
    /// header column; unknown keys are appended. Keys are checked with
    /// [`record_keys`] and nothing is planned if any is blank.
    pub fn reconcile(
        sheet_name: &str,
        headers: &[String],
        index: &KeyIndex,
        records: &[Record],
        key_column: &str,
    ) -> Result<Self, UpsertError> {
        let keys = record_keys(records, key_column)?;

        let mut plan = Self {
            updates: Vec::new(),
            appends: Vec::new(),
        };
        for (record, key) in records.iter().zip(keys) {
            let values = project_record(record, headers);
            match index.row_for(&key) {
                Some(row) => plan.updates.push(RowUpdate {
                    range: row_span(sheet_name, row, headers.len()),
                    row,
                    values,
                }),
                None => plan.appends.push(values),
            }
        }
        Ok(plan)
    }

    pub fn summary(&self) -> UpsertSummary {
        UpsertSummary {
            updated: self.updates.len(),
            inserted: self.appends.len(),
            total: self.updates.len() + self.appends.len(),
        }
    }
}
