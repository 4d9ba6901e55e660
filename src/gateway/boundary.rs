//! Before-dispatch checks for the forwarding endpoint
//!
//! A `POST /proxy` must:
//! - carry a JSON body (`Content-Type: application/json`, parameters ignored)
//! - come from a page served by this relay (`Origin` starts with our own origin)
//!
//! Both checks run before the forwarding gate sees the request.

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{Error, Result};

/// Middleware enforcing the JSON and same-origin requirements on POSTs
pub async fn same_origin_json(request: Request<Body>, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    if let Err(err) = check_boundary(request.uri(), request.headers()) {
        warn!(path = %request.uri().path(), error = %err, "Forward request refused at boundary");
        return err.into_response();
    }

    next.run(request).await
}

/// Run the content-type check, then the origin check
///
/// # Errors
///
/// Returns `Error::UnsupportedMediaType` for a non-JSON body and
/// `Error::OriginMismatch` for a missing or foreign `Origin`.
pub fn check_boundary(uri: &Uri, headers: &HeaderMap) -> Result<()> {
    if !is_json_content_type(headers) {
        return Err(Error::UnsupportedMediaType);
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    match own_origin(uri, headers) {
        Some(expected) if origin.starts_with(&expected) => Ok(()),
        _ => Err(Error::OriginMismatch),
    }
}

/// Whether the media type is exactly `application/json`
#[must_use]
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Origin this service is being reached at: `http://<host[:port]>`
///
/// Taken from the `Host` header, or the request authority for HTTP/2.
#[must_use]
pub fn own_origin(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(ToString::to_string))
        .filter(|h| !h.is_empty())?;
    Some(format!("http://{host}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(*value));
        }
        map
    }

    fn uri() -> Uri {
        Uri::from_static("/proxy")
    }

    #[test]
    fn json_media_type_ignores_parameters_and_case() {
        assert!(is_json_content_type(&headers(&[(
            header::CONTENT_TYPE,
            "application/json"
        )])));
        assert!(is_json_content_type(&headers(&[(
            header::CONTENT_TYPE,
            "Application/JSON; charset=utf-8"
        )])));
        assert!(!is_json_content_type(&headers(&[(
            header::CONTENT_TYPE,
            "text/plain"
        )])));
        assert!(!is_json_content_type(&headers(&[(
            header::CONTENT_TYPE,
            "application/json-patch+json"
        )])));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn own_origin_comes_from_host_header() {
        let map = headers(&[(header::HOST, "127.0.0.1:8000")]);
        assert_eq!(
            own_origin(&uri(), &map).as_deref(),
            Some("http://127.0.0.1:8000")
        );
    }

    #[test]
    fn own_origin_falls_back_to_authority() {
        let uri = Uri::from_static("http://localhost:9000/proxy");
        assert_eq!(
            own_origin(&uri, &HeaderMap::new()).as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(own_origin(&Uri::from_static("/proxy"), &HeaderMap::new()), None);
    }

    #[test]
    fn same_origin_json_passes() {
        let map = headers(&[
            (header::CONTENT_TYPE, "application/json"),
            (header::HOST, "localhost:8000"),
            (header::ORIGIN, "http://localhost:8000"),
        ]);
        assert!(check_boundary(&uri(), &map).is_ok());
    }

    #[test]
    fn content_type_is_checked_before_origin() {
        let map = headers(&[
            (header::CONTENT_TYPE, "text/plain"),
            (header::HOST, "localhost:8000"),
        ]);
        assert!(matches!(
            check_boundary(&uri(), &map),
            Err(Error::UnsupportedMediaType)
        ));
    }

    #[test]
    fn foreign_or_missing_origin_is_refused() {
        for origin in [Some("https://evil.com"), Some("https://localhost:8000"), None] {
            let mut map = headers(&[
                (header::CONTENT_TYPE, "application/json"),
                (header::HOST, "localhost:8000"),
            ]);
            if let Some(o) = origin {
                map.insert(header::ORIGIN, HeaderValue::from_static(o));
            }
            assert!(
                matches!(check_boundary(&uri(), &map), Err(Error::OriginMismatch)),
                "{origin:?}"
            );
        }
    }
}
