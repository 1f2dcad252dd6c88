use crate::errors::ValidationError;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Request fields as received, before any operation-specific parsing.
///
/// Callers may send fields flat or wrapped as `{"form_data": {...}}`; both
/// resolve to the same [`FormData::fields`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    root: Map<String, Value>,
}

impl FormData {
    pub fn new(root: Map<String, Value>) -> Self {
        Self { root }
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(root) => Ok(Self::new(root)),
            Value::Null => Ok(Self::default()),
            _ => Err(ValidationError::new(
                "request",
                "Request body must be a JSON object",
            )),
        }
    }

    /// Query-string or urlencoded pairs. A repeated key collects into a list.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut root = Map::new();
        for (key, value) in pairs {
            let key: String = key.into();
            let value = Value::String(value.into());
            match root.get_mut(&key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    root.insert(key, value);
                }
            }
        }
        Self { root }
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn get_root(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// The operation fields, unwrapped from `form_data` when present.
    pub fn fields(&self) -> Map<String, Value> {
        match self.root.get("form_data") {
            Some(Value::Object(fields)) => fields.clone(),
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(fields)) => fields,
                _ => self.root.clone(),
            },
            _ => self.root.clone(),
        }
    }

    pub fn params<T: DeserializeOwned>(&self, operation: &'static str) -> Result<T, ValidationError> {
        serde_json::from_value(Value::Object(self.fields()))
            .map_err(|e| ValidationError::new(operation, format!("Invalid request: {e}")))
    }
}

/// The first non-blank value, as the caller sent it.
pub fn required<'a>(
    value: &'a Option<String>,
    operation: &'static str,
    field: &str,
    message: &str,
) -> Result<&'a str, ValidationError> {
    match value.as_deref() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ValidationError::new(operation, message).with_field(field)),
    }
}

/// `true/false/1/0/yes/no/on/off`, case-insensitive. Blank means unset.
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accept strings, numbers and booleans where text is expected.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected text, found {}",
            value_kind(&other)
        ))),
    }
}

/// Accept JSON booleans, 0/1 and the usual checkbox strings.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_f64().is_some_and(|n| n != 0.0))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_flag(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid boolean: {s:?}"))),
        Some(other) => Err(de::Error::custom(format!(
            "expected a boolean, found {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
