//! Error types shared by the client, the repository and the screens.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to complete an HTTP exchange or to make sense of its body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors returned by [`crate::tiktek_client::TiktekClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service answered with `Success: false`.
    #[error("remote operation failed: {}", fmt_code(.code))]
    RemoteOperationFailed { code: Option<i64> },
}

/// Errors surfaced to screens. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{operation} failed: {source}")]
    TransportFailed {
        operation: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("{operation} failed: {}", fmt_code(.code))]
    RemoteOperationFailed {
        operation: &'static str,
        code: Option<i64>,
    },
    #[error("favorites storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

impl CatalogError {
    pub fn from_client(operation: &'static str, err: ClientError) -> Self {
        match err {
            ClientError::Transport(source) => CatalogError::TransportFailed { operation, source },
            ClientError::RemoteOperationFailed { code } => {
                CatalogError::RemoteOperationFailed { operation, code }
            }
        }
    }

    /// Message code carried by a failed envelope, if that is what happened.
    pub fn message_code(&self) -> Option<i64> {
        match self {
            CatalogError::RemoteOperationFailed { code, .. } => *code,
            _ => None,
        }
    }
}

fn fmt_code(code: &Option<i64>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "no message code".to_string(),
    }
}
