use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hsync_directory::DirectoryError;
use hsync_store::StoreError;
use thiserror::Error;
use tracing::{error, warn};

use crate::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("origin not allowed: {0}")]
    AccessDenied(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("failed to bind {addr}: {reason}")]
    BindFailure { addr: SocketAddr, reason: String },

    #[error("server is shutting down")]
    ShuttingDown,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<DirectoryError> for ServerError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            DirectoryError::Storage(e) => Self::Storage(e),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            // Everything else is treated as a failed request, not a server crash.
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::InvalidArgument(msg) => msg.clone(),
            Self::AccessDenied(_) => "origin not allowed".to_string(),
            Self::Storage(e) => {
                error!(error = %e, "directory storage failure");
                "oops, couldn't stash that handle".to_string()
            }
            Self::ShuttingDown => self.to_string(),
            other => {
                warn!(error = %other, "request failed");
                "request failed".to_string()
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
