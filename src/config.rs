use crate::backend::CredentialSource;
use crate::backend::google::DEFAULT_API_BASE_URL;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8079";
const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    pub credentials: Option<CredentialSource>,
    pub api_base_url: Url,
    pub request_timeout_ms: Option<u64>,
    pub enabled_operations: Option<HashSet<String>>,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            credentials_file: cli_credentials_file,
            service_account_json: cli_service_account_json,
            api_base_url: cli_api_base_url,
            request_timeout_ms: cli_request_timeout_ms,
            enabled_operations: cli_enabled_operations,
            max_body_bytes: cli_max_body_bytes,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };
        let config_dir = config
            .as_ref()
            .and_then(|path| path.parent())
            .map(Path::to_path_buf);

        let PartialConfig {
            http_bind: file_http_bind,
            credentials_file: file_credentials_file,
            service_account_json: file_service_account_json,
            api_base_url: file_api_base_url,
            request_timeout_ms: file_request_timeout_ms,
            enabled_operations: file_enabled_operations,
            max_body_bytes: file_max_body_bytes,
        } = file_config;

        let http_bind_address = match cli_http_bind.or(file_http_bind) {
            Some(addr) => addr,
            None => DEFAULT_HTTP_BIND
                .parse()
                .context("default bind address is invalid")?,
        };

        // Relative paths in the config file are relative to the file itself.
        let file_credentials_file = file_credentials_file.map(|path| match &config_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        });
        let credentials = cli_credentials_file
            .map(CredentialSource::File)
            .or_else(|| {
                cli_service_account_json
                    .filter(|json| !json.trim().is_empty())
                    .map(CredentialSource::Inline)
            })
            .or_else(|| file_credentials_file.map(CredentialSource::File))
            .or_else(|| {
                file_service_account_json
                    .filter(|json| !json.trim().is_empty())
                    .map(CredentialSource::Inline)
            });

        let api_base_url = match cli_api_base_url.or(file_api_base_url) {
            Some(raw) => {
                Url::parse(&raw).with_context(|| format!("invalid api base url '{raw}'"))?
            }
            None => Url::parse(DEFAULT_API_BASE_URL).context("default api base url is invalid")?,
        };
        anyhow::ensure!(
            !api_base_url.cannot_be_a_base(),
            "api base url '{api_base_url}' cannot hold a path"
        );

        let request_timeout_ms = cli_request_timeout_ms
            .or(file_request_timeout_ms)
            .filter(|ms| *ms > 0);

        let enabled_operations = cli_enabled_operations
            .or(file_enabled_operations)
            .map(|ops| {
                ops.into_iter()
                    .map(|op| op.trim().to_ascii_lowercase())
                    .filter(|op| !op.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());

        let max_body_bytes = cli_max_body_bytes
            .or(file_max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
            .max(1024);

        Ok(Self {
            http_bind_address,
            credentials,
            api_base_url,
            request_timeout_ms,
            enabled_operations,
            max_body_bytes,
        })
    }

    /// The server refuses to start without a credential source.
    pub fn ensure_credentials(&self) -> Result<()> {
        match &self.credentials {
            Some(CredentialSource::File(path)) => {
                anyhow::ensure!(
                    path.is_file(),
                    "service account file {:?} does not exist",
                    path
                );
                Ok(())
            }
            Some(CredentialSource::Inline(_)) => Ok(()),
            None => anyhow::bail!(
                "no service account configured; set --credentials-file or GOOGLE_SERVICE_ACCOUNT_JSON"
            ),
        }
    }

    pub fn is_operation_enabled(&self, names: &[&str]) -> bool {
        match &self.enabled_operations {
            Some(set) => names.iter().any(|name| set.contains(*name)),
            None => true,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "sheets-bridge",
    about = "HTTP bridge for row operations on Google Sheets",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_CREDENTIALS_FILE",
        value_name = "FILE",
        help = "Service account key file (JSON)"
    )]
    pub credentials_file: Option<PathBuf>,

    #[arg(
        long,
        env = "GOOGLE_SERVICE_ACCOUNT_JSON",
        value_name = "JSON",
        hide_env_values = true,
        help = "Service account key as inline JSON"
    )]
    pub service_account_json: Option<String>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_API_BASE_URL",
        value_name = "URL",
        help = "Sheets API base URL (default: https://sheets.googleapis.com/v4/)"
    )]
    pub api_base_url: Option<String>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_REQUEST_TIMEOUT_MS",
        value_name = "MS",
        help = "Per-request timeout in milliseconds (default: 0, disabled)",
        value_parser = clap::value_parser!(u64)
    )]
    pub request_timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_ENABLED_OPERATIONS",
        value_name = "MODULE",
        value_delimiter = ',',
        help = "Restrict execution to the listed modules (delete, get, insert, update, upsert)"
    )]
    pub enabled_operations: Option<Vec<String>>,

    #[arg(
        long,
        env = "SHEETS_BRIDGE_MAX_BODY_BYTES",
        value_name = "BYTES",
        help = "Max request body size in bytes (default: 1048576)",
        value_parser = clap::value_parser!(usize)
    )]
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    credentials_file: Option<PathBuf>,
    service_account_json: Option<String>,
    api_base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    enabled_operations: Option<Vec<String>>,
    max_body_bytes: Option<usize>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
