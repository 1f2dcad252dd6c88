use crate::backend::{AccessScope, BackendProvider, GoogleBackendProvider, SheetsBackend};
use crate::config::ServerConfig;
use crate::errors::BackendError;
use std::sync::Arc;

/// Shared by every request; holds nothing that a request mutates.
pub struct AppState {
    config: Arc<ServerConfig>,
    provider: Arc<dyn BackendProvider>,
}

impl AppState {
    /// State backed by the Google Sheets API, using the configured credentials.
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let provider = Arc::new(GoogleBackendProvider::new(
            config.api_base_url.clone(),
            config.credentials.clone(),
        ));
        Self { config, provider }
    }

    pub fn with_provider(config: Arc<ServerConfig>, provider: Arc<dyn BackendProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    /// A freshly credentialed backend for one request.
    pub async fn connect(&self, scope: AccessScope) -> Result<Arc<dyn SheetsBackend>, BackendError> {
        self.provider.connect(scope).await
    }
}
