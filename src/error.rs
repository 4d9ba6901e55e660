//! Error types for the relay gate

use std::io;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for the relay gate
pub type Result<T> = std::result::Result<T, Error>;

/// Relay gate errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed forward request (bad JSON, bad URL, bad timeout)
    #[error("{0}")]
    InvalidRequest(String),

    /// Target host did not match any allowlist entry
    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    /// Outbound call failed before a response was obtained
    #[error("{0}")]
    UpstreamUnreachable(String),

    /// Inbound request was not JSON
    #[error("JSON required")]
    UnsupportedMediaType,

    /// Inbound `Origin` did not match the service's own origin
    #[error("Invalid origin")]
    OriginMismatch,

    /// Static document not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error is surfaced with
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::HostNotAllowed(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::OriginMismatch => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Io(_) | Self::Http(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
