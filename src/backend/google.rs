use super::credentials::CredentialSource;
use super::{
    AccessScope, BackendProvider, BatchRequest, SheetProperties, SheetsBackend, ValueInputOption,
    WriteOutcome,
};
use crate::errors::{BackendError, BackendErrorKind};
use crate::rows::SheetGrid;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/";

/// Sheets v4 REST client bound to one access token.
#[derive(Debug, Clone)]
pub struct GoogleSheetsBackend {
    client: reqwest::Client,
    base_url: Url,
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UpdateValuesResponse {
    updated_range: String,
    updated_rows: usize,
    updated_columns: usize,
}

impl From<UpdateValuesResponse> for WriteOutcome {
    fn from(resp: UpdateValuesResponse) -> Self {
        Self {
            updated_range: resp.updated_range,
            updated_rows: resp.updated_rows,
            updated_columns: resp.updated_columns,
        }
    }
}

#[derive(Deserialize)]
struct AppendValuesResponse {
    #[serde(default)]
    updates: UpdateValuesResponse,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl GoogleSheetsBackend {
    pub fn new(client: reqwest::Client, base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            access_token: access_token.into(),
        }
    }

    /// `{base}/spreadsheets/{id}` followed by `segments`, each percent-encoded.
    pub fn endpoint(&self, spreadsheet_id: &str, segments: &[&str]) -> Result<Url, BackendError> {
        spreadsheet_url(&self.base_url, spreadsheet_id, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            return Err(BackendError::from_status(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            BackendError::new(
                BackendErrorKind::Unknown,
                format!("unexpected Sheets API response: {e}"),
            )
        })
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
        BackendErrorKind::Network
    } else {
        BackendErrorKind::from_message(&err.to_string())
    };
    BackendError::new(kind, err.to_string())
}

pub fn spreadsheet_url(
    base_url: &Url,
    spreadsheet_id: &str,
    segments: &[&str],
) -> Result<Url, BackendError> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            BackendError::new(
                BackendErrorKind::Unknown,
                format!("API base URL cannot hold a path: {base_url}"),
            )
        })?;
        path.pop_if_empty().push("spreadsheets");
        match segments.split_first() {
            // `{id}:batchUpdate` style methods attach to the id segment.
            Some((first, rest)) if first.starts_with(':') => {
                path.push(&format!("{spreadsheet_id}{first}"));
                path.extend(rest);
            }
            _ => {
                path.push(spreadsheet_id);
                path.extend(segments);
            }
        }
    }
    Ok(url)
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsBackend for GoogleSheetsBackend {
    async fn get_metadata(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, BackendError> {
        let url = self.endpoint(spreadsheet_id, &[])?;
        tracing::debug!(%url, "get spreadsheet metadata");
        let metadata: SpreadsheetMetadata = self
            .send(
                self.request(Method::GET, url)
                    .query(&[("fields", "sheets.properties")]),
            )
            .await?;
        Ok(metadata.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<SheetGrid, BackendError> {
        let url = self.endpoint(spreadsheet_id, &["values", range])?;
        tracing::debug!(%url, "get values");
        let values: ValueRange = self.send(self.request(Method::GET, url)).await?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        option: ValueInputOption,
    ) -> Result<WriteOutcome, BackendError> {
        let url = self.endpoint(spreadsheet_id, &["values", range])?;
        tracing::debug!(%url, rows = values.len(), "update values");
        let resp: UpdateValuesResponse = self
            .send(
                self.request(Method::PUT, url)
                    .query(&[("valueInputOption", option.as_str())])
                    .json(&json!({ "majorDimension": "ROWS", "values": values })),
            )
            .await?;
        Ok(resp.into())
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<Value>],
        option: ValueInputOption,
    ) -> Result<WriteOutcome, BackendError> {
        let method = format!("{range}:append");
        let url = self.endpoint(spreadsheet_id, &["values", &method])?;
        tracing::debug!(%url, rows = values.len(), "append values");
        let resp: AppendValuesResponse = self
            .send(
                self.request(Method::POST, url)
                    .query(&[
                        ("valueInputOption", option.as_str()),
                        ("insertDataOption", "INSERT_ROWS"),
                    ])
                    .json(&json!({ "majorDimension": "ROWS", "values": values })),
            )
            .await?;
        Ok(resp.updates.into())
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: &[BatchRequest],
    ) -> Result<(), BackendError> {
        let url = self.endpoint(spreadsheet_id, &[":batchUpdate"])?;
        tracing::debug!(%url, requests = requests.len(), "batch update");
        let _: Value = self
            .send(
                self.request(Method::POST, url)
                    .json(&json!({ "requests": requests })),
            )
            .await?;
        Ok(())
    }
}

/// Loads the service account and exchanges it for a token on every `connect`.
#[derive(Debug, Clone)]
pub struct GoogleBackendProvider {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<CredentialSource>,
}

impl GoogleBackendProvider {
    pub fn new(base_url: Url, credentials: Option<CredentialSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }
}

#[async_trait]
impl BackendProvider for GoogleBackendProvider {
    async fn connect(&self, scope: AccessScope) -> Result<Arc<dyn SheetsBackend>, BackendError> {
        let source = self.credentials.as_ref().ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::Auth,
                "no service account credentials configured",
            )
        })?;
        let account = source.load().await?;
        let token = account.fetch_access_token(&self.client, scope).await?;
        tracing::debug!(
            client_email = %account.client_email,
            expires_in = token.expires_in,
            "obtained access token"
        );
        Ok(Arc::new(GoogleSheetsBackend::new(
            self.client.clone(),
            self.base_url.clone(),
            token.access_token,
        )))
    }
}
