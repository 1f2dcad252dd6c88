use crate::config::ServerConfig;
use crate::envelope::Envelope;
use crate::errors::ValidationError;
use crate::ops::{self, FormData, Operation};
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Path, Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::{HeaderMap, header::CONTENT_TYPE},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;

type Pairs = Vec<(String, String)>;

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Execute,
    Content,
}

/// Every module exposes `execute` and `content`, each over GET and POST.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config().max_body_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/{module}/v1/execute",
            get(execute_query).post(execute_body),
        )
        .route(
            "/{module}/v1/content",
            get(content_query).post(content_body),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn serve(config: Arc<ServerConfig>) -> Result<()> {
    let address = config.http_bind_address;
    let state = Arc::new(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(address = %listener.local_addr()?, "sheets bridge listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|error| tracing::error!("serving error: {:?}", error))?;
    tracing::info!("sheets bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn healthz() -> &'static str {
    "OK"
}

async fn execute_query(
    State(state): State<Arc<AppState>>,
    Path(module): Path<String>,
    query: Result<Query<Pairs>, QueryRejection>,
) -> Json<Envelope> {
    let form = query
        .map(|Query(pairs)| FormData::from_pairs(pairs))
        .map_err(|rejection| request_error(rejection.body_text()));
    Json(respond(state, &module, Endpoint::Execute, form).await)
}

async fn execute_body(
    State(state): State<Arc<AppState>>,
    Path(module): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Json<Envelope> {
    let form = read_body(&headers, body);
    Json(respond(state, &module, Endpoint::Execute, form).await)
}

async fn content_query(
    State(state): State<Arc<AppState>>,
    Path(module): Path<String>,
    query: Result<Query<Pairs>, QueryRejection>,
) -> Json<Envelope> {
    let form = query
        .map(|Query(pairs)| FormData::from_pairs(pairs))
        .map_err(|rejection| request_error(rejection.body_text()));
    Json(respond(state, &module, Endpoint::Content, form).await)
}

async fn content_body(
    State(state): State<Arc<AppState>>,
    Path(module): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Json<Envelope> {
    let form = read_body(&headers, body);
    Json(respond(state, &module, Endpoint::Content, form).await)
}

async fn respond(
    state: Arc<AppState>,
    module: &str,
    endpoint: Endpoint,
    form: Result<FormData, ValidationError>,
) -> Envelope {
    let Ok(operation) = module.parse::<Operation>() else {
        tracing::warn!(module, "unknown module requested");
        return Envelope::error(format!("Unknown module '{module}'"));
    };
    let form = match form {
        Ok(form) => form,
        Err(err) => {
            tracing::warn!(%operation, error = %err, "unreadable request");
            return Envelope::error(err.to_string());
        }
    };
    match endpoint {
        Endpoint::Execute => ops::execute(state, operation, &form).await,
        Endpoint::Content => ops::content(state, operation, &form).await,
    }
}

fn request_error(message: impl std::fmt::Display) -> ValidationError {
    ValidationError::new("request", format!("Invalid request: {message}"))
}

/// JSON unless the caller says urlencoded; an untyped body that is not JSON
/// is tried as a form.
fn read_body(
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<FormData, ValidationError> {
    let body = body.map_err(|rejection| request_error(rejection.body_text()))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FormData::default());
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return urlencoded(&body);
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(value) => FormData::from_value(value),
        Err(_) if !content_type.contains("json") => urlencoded(&body),
        Err(e) => Err(request_error(format!("body is not valid JSON ({e})"))),
    }
}

fn urlencoded(body: &[u8]) -> Result<FormData, ValidationError> {
    serde_urlencoded::from_bytes::<Pairs>(body)
        .map(FormData::from_pairs)
        .map_err(request_error)
}
