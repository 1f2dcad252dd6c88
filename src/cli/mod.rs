pub mod output;

use crate::config::{CliArgs, ServerConfig};
use crate::envelope::Envelope;
use crate::ops::{self, FormData, Operation};
use crate::state::AppState;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "sheets-cli",
    version,
    about = "Run Google Sheets row operations from the command line"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub compact: bool,

    /// Print nothing on success; errors still go to stderr.
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_CREDENTIALS_FILE",
        value_name = "FILE",
        global = true
    )]
    pub credentials_file: Option<PathBuf>,

    #[arg(
        long,
        env = "GOOGLE_SERVICE_ACCOUNT_JSON",
        value_name = "JSON",
        hide_env_values = true,
        global = true
    )]
    pub service_account_json: Option<String>,

    #[arg(long, env = "SHEETS_BRIDGE_API_BASE_URL", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    #[arg(long, value_name = "MS", global = true)]
    pub request_timeout_ms: Option<u64>,
}

impl ConnectionArgs {
    pub fn into_config(self) -> Result<ServerConfig> {
        ServerConfig::from_args(CliArgs {
            config: self.config,
            credentials_file: self.credentials_file,
            service_account_json: self.service_account_json,
            api_base_url: self.api_base_url,
            request_timeout_ms: self.request_timeout_ms,
            ..CliArgs::default()
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read a sheet or a range of it.
    Read {
        spreadsheet_id: String,
        sheet_name: String,
        #[arg(long)]
        range: Option<String>,
        /// Drop the first returned row.
        #[arg(long)]
        no_headers: bool,
    },
    /// Append a JSON array of objects as rows.
    Insert {
        spreadsheet_id: String,
        sheet_name: String,
        data: String,
        #[arg(long)]
        include_headers: bool,
    },
    /// Write a JSON value grid at a range.
    Update {
        spreadsheet_id: String,
        sheet_name: String,
        data: String,
        #[arg(long)]
        range: Option<String>,
        #[arg(long, value_name = "RAW|USER_ENTERED")]
        value_input_option: Option<String>,
        #[arg(long)]
        yes: bool,
    },
    /// Delete rows, e.g. `5`, `5-10` or `5,7,10-12`.
    Delete {
        spreadsheet_id: String,
        sheet_name: String,
        rows: String,
        #[arg(long)]
        yes: bool,
    },
    /// Update rows matched on a key column and append the rest.
    Upsert {
        spreadsheet_id: String,
        sheet_name: String,
        key_column: String,
        data: String,
        #[arg(long)]
        yes: bool,
    },
    /// List the sheets of a spreadsheet.
    Sheets { spreadsheet_id: String },
}

impl Commands {
    /// The request fields the HTTP endpoints would receive for this command.
    fn request(self) -> (Operation, Value) {
        match self {
            Commands::Read {
                spreadsheet_id,
                sheet_name,
                range,
                no_headers,
            } => (
                Operation::Get,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "sheet_name": sheet_name,
                    "range": range,
                    "include_headers": !no_headers,
                }),
            ),
            Commands::Insert {
                spreadsheet_id,
                sheet_name,
                data,
                include_headers,
            } => (
                Operation::Insert,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "sheet_name": sheet_name,
                    "data_to_insert": data,
                    "include_headers": include_headers,
                }),
            ),
            Commands::Update {
                spreadsheet_id,
                sheet_name,
                data,
                range,
                value_input_option,
                yes,
            } => (
                Operation::Update,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "sheet_name": sheet_name,
                    "range": range,
                    "update_data": data,
                    "value_input_option": value_input_option,
                    "confirm_update": yes,
                }),
            ),
            Commands::Delete {
                spreadsheet_id,
                sheet_name,
                rows,
                yes,
            } => (
                Operation::Delete,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "sheet_name": sheet_name,
                    "row_numbers": rows,
                    "confirm_deletion": yes,
                }),
            ),
            Commands::Upsert {
                spreadsheet_id,
                sheet_name,
                key_column,
                data,
                yes,
            } => (
                Operation::Upsert,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "sheet_name": sheet_name,
                    "key_column": key_column,
                    "data_to_upsert": data,
                    "confirm_upsert": yes,
                }),
            ),
            Commands::Sheets { spreadsheet_id } => (
                Operation::Get,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "content_object_names": ["available_sheets"],
                }),
            ),
        }
    }
}

fn form(fields: Value) -> FormData {
    match fields {
        Value::Object(map) => FormData::new(map),
        _ => FormData::new(Map::new()),
    }
}

pub async fn run_command(state: Arc<AppState>, command: Commands) -> Envelope {
    let listing = matches!(command, Commands::Sheets { .. });
    let (operation, fields) = command.request();
    let form = form(fields);
    if listing {
        ops::content(state, operation, &form).await
    } else {
        ops::execute(state, operation, &form).await
    }
}
