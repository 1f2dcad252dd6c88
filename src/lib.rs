pub mod backend;
pub mod cli;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod ops;
pub mod rows;
pub mod server;
pub mod state;

pub use config::{CliArgs, ServerConfig};
pub use envelope::Envelope;
pub use ops::Operation;
pub use server::router;
pub use state::AppState;

use anyhow::Result;
use std::sync::Arc;

pub async fn run_server(config: Arc<ServerConfig>) -> Result<()> {
    tracing::info!(
        bind = %config.http_bind_address,
        api_base_url = %config.api_base_url,
        "starting sheets bridge"
    );
    server::serve(config).await
}
