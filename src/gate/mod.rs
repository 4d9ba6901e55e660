//! Forwarding gate: validates a forward request, re-issues it upstream and
//! normalizes whatever comes back.
//!
//! # Security
//!
//! - Only `http`/`https` URLs whose host passes the [`Allowlist`] are contacted,
//!   and redirects are followed only while every hop passes it too.
//! - Caller headers go upstream unmodified. Credential-looking headers are
//!   stripped from the diagnostic echo in the 502 envelope and nowhere else.
//! - Header values, bodies and query strings are never logged.

pub mod allowlist;
pub mod redact;
pub mod request;
pub mod response;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    Client, Method, redirect,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use tracing::{debug, info, warn};
use url::Url;

pub use allowlist::{Allowlist, AllowlistEntry, hostname};
pub use redact::{is_sensitive_header, redact_headers};
pub use request::{DEFAULT_TIMEOUT, ForwardBody, ForwardRequest};
pub use response::{ForwardResponse, ResponseBody, collect_headers};

use crate::{Error, Result};

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Validates and dispatches forward requests against a fixed allowlist
#[derive(Debug, Clone)]
pub struct ForwardGate {
    client: Client,
    allowlist: Arc<Allowlist>,
}

impl ForwardGate {
    /// Create a gate bound to `allowlist` for its whole lifetime
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be initialized.
    pub fn new(allowlist: Allowlist) -> Result<Self> {
        let allowlist = Arc::new(allowlist);
        let hops = Arc::clone(&allowlist);

        let client = Client::builder()
            .redirect(redirect::Policy::custom(move |attempt| {
                if attempt.previous().len() > MAX_REDIRECTS {
                    return attempt.error("too many redirects");
                }
                match hops.check_url(attempt.url()) {
                    Ok(()) => attempt.follow(),
                    Err(e) => attempt.error(e),
                }
            }))
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// The allowlist this gate enforces
    #[must_use]
    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Parse `raw` and check it is an allowlisted `http`/`https` target
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` for an unparseable URL, a scheme other
    /// than `http`/`https` or a missing host, and `Error::HostNotAllowed` when
    /// the host fails the allowlist.
    pub fn validate_target(&self, raw: &str) -> Result<Url> {
        let invalid = || Error::InvalidRequest("Invalid URL".to_string());

        let url = Url::parse(raw).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let host = hostname(&url).filter(|h| !h.is_empty()).ok_or_else(invalid)?;

        self.allowlist.check(&host)?;
        Ok(url)
    }

    /// Forward one request.
    ///
    /// Never fails: validation problems become a 400 envelope, transport
    /// problems (including the timeout) a 502 envelope.
    pub async fn forward(&self, request: ForwardRequest) -> ForwardResponse {
        let method = request.normalized_method();

        let target = match self.validate_target(&request.url) {
            Ok(url) => url,
            Err(err) => {
                debug!(method = %method, error = %err, "Forward request rejected");
                return ForwardResponse::rejected(&err);
            }
        };
        let host = hostname(&target).unwrap_or_default();

        match self.dispatch(&method, target, &request).await {
            Ok(response) => {
                info!(method = %method, host = %host, status = response.status(), "Forwarded");
                response
            }
            Err(err) => {
                warn!(method = %method, host = %host, error = %err, "Upstream unreachable");
                ForwardResponse::Unreachable {
                    error: err.to_string(),
                    method,
                    url: request.url,
                    headers: redact_headers(&request.headers),
                }
            }
        }
    }

    /// Perform the outbound call and normalize the reply
    async fn dispatch(
        &self,
        method: &str,
        target: Url,
        request: &ForwardRequest,
    ) -> Result<ForwardResponse> {
        let verb = Method::from_bytes(method.as_bytes()).map_err(|_| {
            Error::UpstreamUnreachable(format!("Invalid HTTP method: {method}"))
        })?;
        let headers = outbound_headers(request)?;

        let mut builder = self
            .client
            .request(verb, target)
            .headers(headers)
            .timeout(request.timeout);

        builder = match &request.body {
            ForwardBody::Absent => builder,
            ForwardBody::Text(text) => builder.body(text.clone()),
            ForwardBody::Binary(bytes) => builder.body(bytes.clone()),
            ForwardBody::Structured(value) => builder.json(value),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&e, request.timeout))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let payload = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e, request.timeout))?;

        Ok(ForwardResponse::Success {
            status,
            headers,
            body: ResponseBody::from_bytes(&payload),
        })
    }
}

/// Caller headers as a wire header map, in full.
///
/// Names are case-insensitive on the wire, so names differing only in case
/// collapse to one header. Headers are applied in byte order of their names
/// and the last one wins (`Accept` then `accept`). Error messages name the
/// offending header but never include its value.
fn outbound_headers(request: &ForwardRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            Error::UpstreamUnreachable(format!("Invalid header name: {name:?}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            Error::UpstreamUnreachable(format!("Invalid value for header {name:?}"))
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Describe a client failure, including its cause chain
fn transport_error(err: &reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        return Error::UpstreamUnreachable(format!(
            "Upstream request timed out after {}s",
            timeout.as_secs_f64()
        ));
    }

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    Error::UpstreamUnreachable(message)
}
