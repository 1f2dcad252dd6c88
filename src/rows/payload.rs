use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One object-shaped row; field order is preserved.
pub type Record = Map<String, Value>;

/// Positional cell values, one inner vector per row.
pub type ValueGrid = Vec<Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    MalformedJson(String),
    #[error("{0}")]
    SchemaViolation(String),
    #[error("unsupported data shape: {0}")]
    UnsupportedShape(String),
}

/// A payload field as callers send it: JSON text, an already-decoded list,
/// or a bare scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawPayload {
    Text(String),
    List(Vec<Value>),
    Scalar(Value),
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items),
            other => Self::Scalar(other),
        }
    }
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl RawPayload {
    /// Blank text, empty lists and null count as "not provided".
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Scalar(value) => value.is_null(),
        }
    }
}

/// Decode a list of objects, as used by insert and upsert.
pub fn normalize_objects(raw: RawPayload) -> Result<Vec<Record>, PayloadError> {
    let decoded = match raw {
        RawPayload::Text(text) => serde_json::from_str::<Value>(&text)
            .map_err(|e| PayloadError::MalformedJson(e.to_string()))?,
        RawPayload::List(items) => Value::Array(items),
        RawPayload::Scalar(_) => {
            return Err(PayloadError::SchemaViolation(
                "data must be a JSON string or a list".to_string(),
            ));
        }
    };

    let Value::Array(items) = decoded else {
        return Err(PayloadError::SchemaViolation(
            "data must be a list/array".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(PayloadError::SchemaViolation(format!(
                "each element must be an object (element {} is not)",
                idx + 1
            ))),
        })
        .collect()
}

/// Decode a rectangular-ish grid of values, as used by update.
///
/// A list of lists passes through, a flat list becomes one row and a scalar
/// becomes a 1x1 grid.
pub fn normalize_grid(raw: RawPayload) -> Result<ValueGrid, PayloadError> {
    let decoded = match raw {
        RawPayload::Text(text) => {
            if text.trim().is_empty() {
                return Err(PayloadError::UnsupportedShape(
                    "update data is empty".to_string(),
                ));
            }
            serde_json::from_str::<Value>(&text)
                .map_err(|e| PayloadError::MalformedJson(e.to_string()))?
        }
        RawPayload::List(items) => Value::Array(items),
        RawPayload::Scalar(value) => value,
    };

    match decoded {
        Value::Array(items) if items.is_empty() => Err(PayloadError::UnsupportedShape(
            "update data contains no values".to_string(),
        )),
        Value::Array(items) if !items.iter().any(Value::is_array) => Ok(vec![scalar_row(items)?]),
        Value::Array(items) => {
            let width = items.len();
            let rows: Vec<Vec<Value>> = items
                .into_iter()
                .filter_map(|row| match row {
                    Value::Array(cells) => Some(cells),
                    _ => None,
                })
                .collect();
            if rows.len() != width {
                return Err(PayloadError::UnsupportedShape(
                    "rows must be all lists or all values, not a mix".to_string(),
                ));
            }
            rows.into_iter().map(scalar_row).collect()
        }
        scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => Ok(vec![vec![scalar]]),
        Value::Null => Err(PayloadError::UnsupportedShape("null".to_string())),
        Value::Object(_) => Err(PayloadError::UnsupportedShape(
            "an object is not a grid of values".to_string(),
        )),
    }
}

fn scalar_row(cells: Vec<Value>) -> Result<Vec<Value>, PayloadError> {
    if cells.iter().any(|c| c.is_array() || c.is_object()) {
        return Err(PayloadError::UnsupportedShape(
            "cells must be strings, numbers, booleans or null".to_string(),
        ));
    }
    Ok(cells)
}

/// Text a scalar reads back as from a sheet, used for key matching; `None` for
/// null, lists and objects. Booleans are stored as `TRUE`/`FALSE`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Lay a record out positionally under `headers`; missing fields become "".
pub fn project_record(record: &Record, headers: &[String]) -> Vec<Value> {
    headers
        .iter()
        .map(|header| match record.get(header) {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(nested @ (Value::Array(_) | Value::Object(_))) => Value::String(nested.to_string()),
            Some(value) => value.clone(),
        })
        .collect()
}
