use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// A successful operation result with the metadata it reports alongside `data`.
pub trait Reply: Serialize {
    fn metadata(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// `{"data": ..., "metadata": {"status": ...}}`, the body of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Envelope {
    pub fn with_status(data: Value, status: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("status".to_string(), Value::from(status));
        Self { data, metadata }
    }

    pub fn success<R: Reply>(reply: &R) -> Self {
        match serde_json::to_value(reply) {
            Ok(data) => {
                let mut envelope = Self::with_status(data, STATUS_SUCCESS);
                envelope.metadata.extend(reply.metadata());
                envelope
            }
            Err(e) => Self::error(format!("Failed to encode response: {e}")),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(json!({ "error": message.into() }), STATUS_ERROR)
    }

    pub fn status(&self) -> Option<&str> {
        self.metadata.get("status").and_then(Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(STATUS_SUCCESS)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }
}

/// Build a metadata map from literal pairs.
pub fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
