use crate::rows::{KeyIndexError, PayloadError, SelectorError, UpsertError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ValidationError {
    operation: &'static str,
    message: String,
    field: Option<String>,
}

impl ValidationError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

#[derive(Debug, Error)]
#[error("You must confirm the {action} by checking the confirmation box")]
pub struct ConfirmationRequired {
    action: &'static str,
    field: &'static str,
}

impl ConfirmationRequired {
    pub fn new(action: &'static str, field: &'static str) -> Self {
        Self { action, field }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

#[derive(Debug, Error)]
#[error("Module '{module}' is disabled by server configuration")]
pub struct OperationDisabledError {
    module: String,
}

impl OperationDisabledError {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into().to_ascii_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    Auth,
    NotFound,
    RateLimited,
    Network,
    Unknown,
}

impl BackendErrorKind {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(Self::Auth),
            404 => Some(Self::NotFound),
            429 => Some(Self::RateLimited),
            502..=504 => Some(Self::Network),
            _ => None,
        }
    }

    /// Best-effort classification from free-form error text.
    pub fn from_message(message: &str) -> Self {
        let text = message.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if has(&["permission", "unauthorized", "403", "401"])
            || (text.contains("invalid") && text.contains("key"))
        {
            Self::Auth
        } else if has(&["not found", "404"]) {
            Self::NotFound
        } else if has(&["quota", "rate limit", "429"]) {
            Self::RateLimited
        } else if has(&["network", "connection", "timeout", "timed out"]) {
            Self::Network
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    kind: BackendErrorKind,
    status: Option<u16>,
    message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Classify by message text alone.
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(BackendErrorKind::from_message(&message), message)
    }

    /// Classify by HTTP status, falling back to the message text.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = BackendErrorKind::from_status(status)
            .unwrap_or_else(|| BackendErrorKind::from_message(&message));
        Self {
            kind,
            status: Some(status),
            message,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error taxonomy used when logging a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Parse,
    ConfirmationRequired,
    Disabled,
    BackendAuth,
    BackendNotFound,
    BackendRateLimited,
    BackendNetwork,
    BackendUnknown,
}

impl From<BackendErrorKind> for ErrorKind {
    fn from(kind: BackendErrorKind) -> Self {
        match kind {
            BackendErrorKind::Auth => Self::BackendAuth,
            BackendErrorKind::NotFound => Self::BackendNotFound,
            BackendErrorKind::RateLimited => Self::BackendRateLimited,
            BackendErrorKind::Network => Self::BackendNetwork,
            BackendErrorKind::Unknown => Self::BackendUnknown,
        }
    }
}

/// Walk the error chain and pick the most specific kind.
pub fn classify(error: &anyhow::Error) -> ErrorKind {
    for cause in error.chain() {
        if cause.is::<ValidationError>()
            || cause.is::<KeyIndexError>()
            || cause.is::<UpsertError>()
        {
            return ErrorKind::Validation;
        }
        if cause.is::<SelectorError>() || cause.is::<PayloadError>() {
            return ErrorKind::Parse;
        }
        if cause.is::<ConfirmationRequired>() {
            return ErrorKind::ConfirmationRequired;
        }
        if let Some(backend) = cause.downcast_ref::<BackendError>() {
            return backend.kind().into();
        }
        if cause.is::<OperationDisabledError>() {
            return ErrorKind::Disabled;
        }
    }
    BackendErrorKind::from_message(&format!("{error:#}")).into()
}
