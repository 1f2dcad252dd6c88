use super::Operation;
use super::form::FormData;
use crate::backend::AccessScope;
use crate::envelope::Envelope;
use crate::state::AppState;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

const AVAILABLE_SHEETS: &str = "available_sheets";
const AVAILABLE_SPREADSHEETS: &str = "available_spreadsheets";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentObject {
    pub content_object_name: String,
    pub data: Vec<Choice>,
}

/// One entry of a dynamic dropdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Names may be plain strings, `{"id": ...}` objects, a JSON list in text,
/// or a comma-separated string.
pub fn content_object_names(form: &FormData) -> Vec<String> {
    let from_item = |item: &Value| match item {
        Value::String(name) => Some(name.trim().to_string()),
        Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };
    match form.get_root("content_object_names") {
        Some(Value::Array(items)) => items.iter().filter_map(from_item).collect(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items.iter().filter_map(from_item).collect(),
            _ => text
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        },
        _ => Vec::new(),
    }
}

/// Dropdown data for the read module. Lookups that fail yield empty lists.
pub async fn sheet_choices(state: Arc<AppState>, form: &FormData) -> Envelope {
    let names = content_object_names(form);
    let fields = form.fields();
    let spreadsheet_id = fields
        .get("spreadsheet_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let backend = match state.connect(AccessScope::ReadOnly).await {
        Ok(backend) => backend,
        Err(err) => {
            tracing::warn!(error = %err, "content request could not authenticate");
            return Envelope::with_status(json!({ "content_objects": [] }), "authorization_error");
        }
    };

    let mut objects = Vec::with_capacity(names.len());
    for name in names {
        let data = match name.as_str() {
            // Listing spreadsheets needs the Drive API, which this service does not use.
            AVAILABLE_SPREADSHEETS => Vec::new(),
            AVAILABLE_SHEETS => match spreadsheet_id {
                Some(id) => match backend.get_metadata(id).await {
                    Ok(sheets) => sheets
                        .into_iter()
                        .map(|sheet| Choice {
                            value: sheet.title.clone(),
                            label: sheet.title,
                        })
                        .collect(),
                    Err(err) => {
                        tracing::warn!(error = %err, spreadsheet_id = id, "failed to list sheets");
                        Vec::new()
                    }
                },
                None => {
                    tracing::warn!("no spreadsheet_id provided for available_sheets");
                    Vec::new()
                }
            },
            other => {
                tracing::debug!(name = other, "ignoring unknown content object");
                continue;
            }
        };
        objects.push(ContentObject {
            content_object_name: name,
            data,
        });
    }

    tracing::info!(objects = objects.len(), "content objects resolved");
    Envelope::with_status(
        json!({ "content_objects": objects }),
        crate::envelope::STATUS_SUCCESS,
    )
}

/// Static description for modules without dynamic fields.
pub fn describe<P: JsonSchema>(operation: Operation, description: &str) -> Envelope {
    let module = operation.to_string().to_ascii_uppercase();
    let schema = serde_json::to_value(schemars::schema_for!(P)).unwrap_or(Value::Null);
    Envelope::with_status(
        json!({
            "message": format!("{module} module content endpoint"),
            "description": description,
            "input_schema": schema,
        }),
        crate::envelope::STATUS_SUCCESS,
    )
}
