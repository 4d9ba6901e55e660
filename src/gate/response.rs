//! Normalized response envelope returned to the page

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::Error;

/// Upstream payload: parsed JSON when possible, otherwise text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Payload parsed as JSON
    Json(Value),
    /// Payload that was not valid JSON
    Text(String),
}

impl ResponseBody {
    /// Parse `payload` as JSON, falling back to lossy UTF-8 text
    #[must_use]
    pub fn from_bytes(payload: &[u8]) -> Self {
        match serde_json::from_slice(payload) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(payload).into_owned()),
        }
    }
}

/// Outcome of one forward call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForwardResponse {
    /// Upstream answered (any status)
    Success {
        /// Upstream status code
        status: u16,
        /// Upstream response headers, unfiltered
        headers: BTreeMap<String, String>,
        /// Upstream payload
        body: ResponseBody,
    },
    /// The gate refused to make the call
    Rejected {
        /// Human-readable reason
        error: String,
        /// Gate-assigned status (400)
        #[serde(skip)]
        status: u16,
    },
    /// The call was attempted but no response was obtained
    Unreachable {
        /// Transport failure description
        error: String,
        /// Normalized verb that was attempted
        method: String,
        /// Target URL as supplied
        url: String,
        /// Caller headers with credentials removed
        headers: BTreeMap<String, String>,
    },
}

impl ForwardResponse {
    /// Envelope for a validation failure
    #[must_use]
    pub fn rejected(err: &Error) -> Self {
        Self::Rejected {
            error: err.to_string(),
            status: err.status_code().as_u16(),
        }
    }

    /// Upstream status on success, gate-assigned status otherwise
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. } | Self::Rejected { status, .. } => *status,
            Self::Unreachable { .. } => StatusCode::BAD_GATEWAY.as_u16(),
        }
    }

    /// Status to put on the wire.
    ///
    /// Mirrors [`status`](Self::status), except that statuses which forbid a
    /// response body are sent as 200 so the envelope still reaches the page;
    /// the real code stays in the envelope's `status` field.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        let Ok(status) = StatusCode::from_u16(self.status()) else {
            return StatusCode::OK;
        };
        if status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::RESET_CONTENT
            || status == StatusCode::NOT_MODIFIED
        {
            StatusCode::OK
        } else {
            status
        }
    }
}

impl IntoResponse for ForwardResponse {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self)).into_response()
    }
}

/// Flatten upstream headers into a map, joining repeated names with `", "`
#[must_use]
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match out.entry(name.as_str().to_string()) {
            Entry::Occupied(mut existing) => {
                let joined = existing.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value.into_owned());
            }
        }
    }
    out
}
