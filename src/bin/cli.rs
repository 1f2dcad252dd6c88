use anyhow::Result;
use clap::Parser;
use sheets_bridge::cli;
use sheets_bridge::state::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli_args = cli::Cli::parse();
    let config = Arc::new(cli_args.connection.into_config()?);
    let state = Arc::new(AppState::new(config));
    let envelope = cli::run_command(state, cli_args.command).await;
    cli::output::emit_envelope(&envelope, cli_args.compact, cli_args.quiet)?;

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
