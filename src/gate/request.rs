//! Forward request model and its JSON wire form

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// Timeout applied when the caller does not supply one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Payload to send upstream
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ForwardBody {
    /// No request body
    #[default]
    Absent,
    /// UTF-8 text sent as-is
    Text(String),
    /// Raw bytes sent as-is
    Binary(Bytes),
    /// Map or sequence serialized as JSON
    Structured(Value),
}

impl ForwardBody {
    /// Map a JSON wire value onto a body variant.
    ///
    /// Strings become text, objects and arrays are re-serialized as JSON, and
    /// everything else (null, numbers, booleans) means no body.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(_) | Value::Array(_) => Self::Structured(value),
            Value::Null | Value::Bool(_) | Value::Number(_) => Self::Absent,
        }
    }
}

/// A single call the gate is asked to make
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRequest {
    /// HTTP verb as supplied; `None` or empty means `GET`
    pub method: Option<String>,
    /// Absolute target URL
    pub url: String,
    /// Headers forwarded verbatim
    pub headers: BTreeMap<String, String>,
    /// Outbound payload
    pub body: ForwardBody,
    /// Bound on the whole upstream exchange
    pub timeout: Duration,
}

impl ForwardRequest {
    /// `GET url` with no headers, no body and the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: None,
            url: url.into(),
            headers: BTreeMap::new(),
            body: ForwardBody::Absent,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the HTTP verb
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add one header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the payload
    #[must_use]
    pub fn with_body(mut self, body: ForwardBody) -> Self {
        self.body = body;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uppercased verb, `GET` when absent or empty
    #[must_use]
    pub fn normalized_method(&self) -> String {
        match self.method.as_deref() {
            Some(m) if !m.is_empty() => m.to_uppercase(),
            _ => "GET".to_string(),
        }
    }

    /// Decode the `/proxy` JSON payload.
    ///
    /// A `null` document is treated as an empty object, so it fails later on
    /// the missing URL rather than here.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` for malformed JSON, a non-object
    /// document, mistyped fields or a timeout that is not a positive number.
    pub fn from_json_slice(payload: &[u8], default_timeout: Duration) -> Result<Self> {
        let document: Value = serde_json::from_slice(payload)
            .map_err(|e| Error::InvalidRequest(format!("Invalid JSON: {e}")))?;

        let wire = match document {
            Value::Null => WireRequest::default(),
            Value::Object(_) => serde_json::from_value(document)
                .map_err(|e| Error::InvalidRequest(format!("Invalid request: {e}")))?,
            _ => {
                return Err(Error::InvalidRequest(
                    "Request body must be a JSON object".to_string(),
                ));
            }
        };

        let timeout = match wire.timeout {
            None => default_timeout,
            Some(secs) => parse_timeout(secs)?,
        };

        Ok(Self {
            method: wire.method,
            url: wire.url.unwrap_or_default(),
            headers: wire.headers.unwrap_or_default(),
            body: ForwardBody::from_json(wire.body),
            timeout,
        })
    }
}

/// Fields accepted on the wire; unknown fields are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireRequest {
    method: Option<String>,
    url: Option<String>,
    headers: Option<BTreeMap<String, String>>,
    body: Value,
    timeout: Option<f64>,
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    if secs <= 0.0 {
        return Err(Error::InvalidRequest(
            "timeout must be a positive number of seconds".to_string(),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::InvalidRequest(format!("Invalid timeout: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: &Value) -> Result<ForwardRequest> {
        ForwardRequest::from_json_slice(value.to_string().as_bytes(), DEFAULT_TIMEOUT)
    }

    #[test]
    fn full_payload_decodes() {
        let req = decode(&json!({
            "method": "post",
            "url": "https://api.tractionguest.com/v1/ping",
            "headers": {"Authorization": "Bearer t", "Accept": "application/json"},
            "body": {"a": [1, 2]},
            "timeout": 5
        }))
        .unwrap();

        assert_eq!(req.normalized_method(), "POST");
        assert_eq!(req.url, "https://api.tractionguest.com/v1/ping");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.body, ForwardBody::Structured(json!({"a": [1, 2]})));
        assert_eq!(req.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let req = decode(&json!({"url": "https://x.test/"})).unwrap();
        assert_eq!(req.normalized_method(), "GET");
        assert!(req.headers.is_empty());
        assert_eq!(req.body, ForwardBody::Absent);
        assert_eq!(req.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn null_fields_take_defaults() {
        let req = decode(&json!({
            "url": "https://x.test/",
            "method": null,
            "headers": null,
            "body": null,
            "timeout": null
        }))
        .unwrap();
        assert_eq!(req.normalized_method(), "GET");
        assert_eq!(req.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn empty_method_means_get() {
        let req = ForwardRequest::new("https://x.test/").with_method("");
        assert_eq!(req.normalized_method(), "GET");
        let req = ForwardRequest::new("https://x.test/").with_method("propfind");
        assert_eq!(req.normalized_method(), "PROPFIND");
    }

    #[test]
    fn body_variants_follow_json_type() {
        assert_eq!(
            ForwardBody::from_json(json!("raw text")),
            ForwardBody::Text("raw text".to_string())
        );
        assert_eq!(
            ForwardBody::from_json(json!([1, "two"])),
            ForwardBody::Structured(json!([1, "two"]))
        );
        assert_eq!(ForwardBody::from_json(json!(12)), ForwardBody::Absent);
        assert_eq!(ForwardBody::from_json(json!(true)), ForwardBody::Absent);
        assert_eq!(ForwardBody::from_json(Value::Null), ForwardBody::Absent);
    }

    #[test]
    fn fractional_timeout_is_honoured() {
        let req = decode(&json!({"url": "https://x.test/", "timeout": 0.25})).unwrap();
        assert_eq!(req.timeout, Duration::from_millis(250));
    }

    #[test]
    fn non_positive_timeout_is_rejected() {
        for t in [json!(0), json!(-3)] {
            let err = decode(&json!({"url": "https://x.test/", "timeout": t})).unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)));
        }
    }

    #[test]
    fn malformed_json_is_invalid_request() {
        let err = ForwardRequest::from_json_slice(b"{not json", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(ref m) if m.starts_with("Invalid JSON")));
    }

    #[test]
    fn non_object_document_is_invalid_request() {
        let err = decode(&json!(["https://x.test/"])).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn null_document_decodes_to_empty_request() {
        let req = ForwardRequest::from_json_slice(b"null", DEFAULT_TIMEOUT).unwrap();
        assert!(req.url.is_empty());
    }

    #[test]
    fn mistyped_headers_are_invalid_request() {
        let err = decode(&json!({"url": "https://x.test/", "headers": ["a"]})).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
