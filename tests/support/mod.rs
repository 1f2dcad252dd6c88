#![allow(dead_code)]

use serde_json::Value;
use sheets_bridge::backend::{InMemoryBackend, InMemoryProvider};
use sheets_bridge::ops::FormData;
use sheets_bridge::{AppState, CliArgs, ServerConfig};
use std::sync::Arc;

pub const SPREADSHEET: &str = "sheet-123";

/// A server config that never touches Google: no credentials, defaults elsewhere.
pub fn test_config() -> ServerConfig {
    ServerConfig::from_args(CliArgs::default()).expect("default config")
}

pub fn config_with(f: impl FnOnce(&mut ServerConfig)) -> ServerConfig {
    let mut config = test_config();
    f(&mut config);
    config
}

/// App state over an in-memory spreadsheet; the provider is returned so tests
/// can inspect calls and requested scopes.
pub fn memory_state(backend: InMemoryBackend) -> (Arc<AppState>, Arc<InMemoryProvider>) {
    memory_state_with(backend, test_config())
}

pub fn memory_state_with(
    backend: InMemoryBackend,
    config: ServerConfig,
) -> (Arc<AppState>, Arc<InMemoryProvider>) {
    let provider = Arc::new(InMemoryProvider::new(Arc::new(backend)));
    let state = Arc::new(AppState::with_provider(Arc::new(config), provider.clone()));
    (state, provider)
}

/// Six rows in column A: a header and five people.
pub fn people() -> InMemoryBackend {
    InMemoryBackend::new().with_sheet(
        SPREADSHEET,
        "People",
        [
            vec!["id", "name", "email"],
            vec!["1", "Ada", "ada@example.com"],
            vec!["2", "Grace", "grace@example.com"],
            vec!["3", "Edsger", "edsger@example.com"],
            vec!["4", "Barbara", "barbara@example.com"],
            vec!["5", "Donald", "donald@example.com"],
        ],
    )
}

pub fn form(value: Value) -> FormData {
    FormData::from_value(value).expect("object form")
}

pub fn column(rows: &[Vec<String>], index: usize) -> Vec<String> {
    rows.iter()
        .map(|row| row.get(index).cloned().unwrap_or_default())
        .collect()
}
