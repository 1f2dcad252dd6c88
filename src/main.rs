use anyhow::Result;
use clap::Parser;
use sheets_bridge::{CliArgs, ServerConfig, run_server};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = CliArgs::parse();
    let config = ServerConfig::from_args(cli)?;
    config.ensure_credentials()?;
    run_server(Arc::new(config)).await
}
