//! One function per endpoint: validate the request, run the row logic against
//! a freshly connected backend, and shape the reply.

pub mod content;
pub mod delete;
pub mod form;
pub mod insert;
pub mod read;
pub mod update;
pub mod upsert;

pub use delete::{DeleteRowsParams, DeleteRowsResponse, delete_rows};
pub use form::FormData;
pub use insert::{InsertRowsParams, InsertRowsResponse, insert_rows};
pub use read::{ReadRowsParams, ReadRowsResponse, read_rows};
pub use update::{UpdateCellsParams, UpdateCellsResponse, update_cells};
pub use upsert::{UpsertRowsParams, UpsertRowsResponse, upsert_rows};

use crate::envelope::{Envelope, Reply};
use crate::errors::{ErrorKind, OperationDisabledError, classify};
use crate::state::AppState;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Operation {
    Delete,
    #[strum(to_string = "get", serialize = "read")]
    #[serde(alias = "read")]
    Get,
    Insert,
    Update,
    Upsert,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Delete,
        Self::Get,
        Self::Insert,
        Self::Update,
        Self::Upsert,
    ];

    /// Every name the module answers to, canonical first.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Self::Delete => &["delete"],
            Self::Get => &["get", "read"],
            Self::Insert => &["insert"],
            Self::Update => &["update"],
            Self::Upsert => &["upsert"],
        }
    }
}

async fn run<R, F>(state: &AppState, operation: Operation, future: F) -> Result<Envelope>
where
    R: Reply,
    F: Future<Output = Result<R>>,
{
    let reply = if let Some(limit) = state.config().request_timeout() {
        match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "Operation '{}' timed out after {}ms",
                operation,
                limit.as_millis()
            )),
        }
    } else {
        future.await
    }?;
    Ok(Envelope::success(&reply))
}

async fn dispatch(state: Arc<AppState>, operation: Operation, form: &FormData) -> Result<Envelope> {
    let name: &'static str = operation.into();
    match operation {
        Operation::Delete => {
            let params = form.params(name)?;
            run(&state, operation, delete_rows(state.clone(), params)).await
        }
        Operation::Get => {
            let params = form.params(name)?;
            run(&state, operation, read_rows(state.clone(), params)).await
        }
        Operation::Insert => {
            let params = form.params(name)?;
            run(&state, operation, insert_rows(state.clone(), params)).await
        }
        Operation::Update => {
            let params = form.params(name)?;
            run(&state, operation, update_cells(state.clone(), params)).await
        }
        Operation::Upsert => {
            let params = form.params(name)?;
            run(&state, operation, upsert_rows(state.clone(), params)).await
        }
    }
}

fn ensure_enabled(state: &AppState, operation: Operation) -> Result<()> {
    if state.config().is_operation_enabled(operation.names()) {
        Ok(())
    } else {
        Err(OperationDisabledError::new(operation.to_string()).into())
    }
}

fn failure(operation: Operation, err: anyhow::Error) -> Envelope {
    let kind = classify(&err);
    let message = format!("{err:#}");
    match kind {
        ErrorKind::Validation
        | ErrorKind::Parse
        | ErrorKind::ConfirmationRequired
        | ErrorKind::Disabled => {
            tracing::warn!(%operation, %kind, error = %message, "request rejected");
        }
        _ => {
            tracing::error!(%operation, %kind, error = %message, "operation failed");
        }
    }
    Envelope::error(message)
}

/// Run `operation` and turn every outcome, including failures, into an envelope.
pub async fn execute(state: Arc<AppState>, operation: Operation, form: &FormData) -> Envelope {
    tracing::info!(%operation, "operation requested");
    let result = match ensure_enabled(&state, operation) {
        Ok(()) => dispatch(state, operation, form).await,
        Err(err) => Err(err),
    };
    result.unwrap_or_else(|err| failure(operation, err))
}

/// The `/content` endpoint for `operation`. Disabled modules expose nothing.
pub async fn content(state: Arc<AppState>, operation: Operation, form: &FormData) -> Envelope {
    if let Err(err) = ensure_enabled(&state, operation) {
        return failure(operation, err);
    }
    match operation {
        Operation::Get => content::sheet_choices(state, form).await,
        Operation::Delete => content::describe::<DeleteRowsParams>(
            operation,
            "Deletes rows by number, e.g. 5, 5-10 or 5,7,10-12",
        ),
        Operation::Insert => content::describe::<InsertRowsParams>(
            operation,
            "Appends a JSON array of objects as new rows",
        ),
        Operation::Update => content::describe::<UpdateCellsParams>(
            operation,
            "Writes a value grid at a range",
        ),
        Operation::Upsert => content::describe::<UpsertRowsParams>(
            operation,
            "Updates rows matched by a key column and appends the rest",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_names_parse_case_insensitively() {
        assert_eq!("GET".parse::<Operation>().unwrap(), Operation::Get);
        assert_eq!("read".parse::<Operation>().unwrap(), Operation::Get);
        assert_eq!("Upsert".parse::<Operation>().unwrap(), Operation::Upsert);
        assert!("merge".parse::<Operation>().is_err());
        assert_eq!(Operation::Get.to_string(), "get");
    }

    #[test]
    fn every_operation_lists_its_canonical_name_first() {
        for operation in Operation::ALL {
            assert_eq!(operation.names()[0], operation.to_string());
        }
    }
}
