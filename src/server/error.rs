use super::{Dispatch, MetaResponse};
use axum::http::StatusCode;
use serde_json::json;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Access denied: {} is outside the served root", path.display())]
    AccessDenied { path: PathBuf },

    #[error("File too large: {size} bytes (limit: {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Invalid request path: {0}")]
    InvalidRequestPath(String),

    #[error("Failed to resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MetaError {
    /// Status code for errors this subsystem answers itself
    ///
    /// `None` means the request is handed back to the host.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MetaError::AccessDenied { .. } => Some(StatusCode::FORBIDDEN),
            MetaError::FileTooLarge { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            MetaError::InvalidRequestPath(_)
            | MetaError::Resolve { .. }
            | MetaError::Stat { .. } => None,
        }
    }

    pub fn into_dispatch(self) -> Dispatch {
        match self {
            MetaError::AccessDenied { .. } => Dispatch::Rejected(MetaResponse::new(
                StatusCode::FORBIDDEN,
                json!({ "error": "Access denied" }),
            )),
            MetaError::FileTooLarge { limit, .. } => Dispatch::Rejected(MetaResponse::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": "File too large", "limit": limit }),
            )),
            MetaError::InvalidRequestPath(_)
            | MetaError::Resolve { .. }
            | MetaError::Stat { .. } => Dispatch::Unhandled,
        }
    }
}
