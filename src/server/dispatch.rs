use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

/// A JSON response authored by the metadata handler
#[derive(Debug, Clone, PartialEq)]
pub struct MetaResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl MetaResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Serialized body exactly as sent on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }
}

impl IntoResponse for MetaResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Result of offering one request to the handler
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Metadata was built (200)
    Handled(MetaResponse),
    /// The handler refused the request (403 or 413)
    Rejected(MetaResponse),
    /// Not a metadata request, or one that could not be resolved; the host decides
    Unhandled,
}

impl Dispatch {
    /// Whether the handler produced a response
    pub fn is_handled(&self) -> bool {
        !matches!(self, Dispatch::Unhandled)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Dispatch::Handled(response) | Dispatch::Rejected(response) => Some(response.status),
            Dispatch::Unhandled => None,
        }
    }

    /// The response to send, if the handler authored one
    pub fn response(self) -> Option<MetaResponse> {
        match self {
            Dispatch::Handled(response) | Dispatch::Rejected(response) => Some(response),
            Dispatch::Unhandled => None,
        }
    }
}
