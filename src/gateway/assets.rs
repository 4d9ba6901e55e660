//! Root document and companion script

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::router::AppState;
use crate::{Error, Result};

const INDEX_DOCUMENT: &str = "index.html";
const SCRIPT_DOCUMENT: &str = "app.js";

/// GET / - the page, plus a fresh `csrftoken` cookie
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match read_asset(&state.assets_dir, INDEX_DOCUMENT).await {
        Ok(contents) => (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
                (header::SET_COOKIE, csrf_cookie(&csrf_token())),
            ],
            contents,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// GET /app.js
pub async fn script_handler(State(state): State<Arc<AppState>>) -> Response {
    match read_asset(&state.assets_dir, SCRIPT_DOCUMENT).await {
        Ok(contents) => (
            [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
            contents,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn read_asset(dir: &Path, name: &str) -> Result<Vec<u8>> {
    match tokio::fs::read(dir.join(name)).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(format!("/{name}"))),
        Err(e) => Err(Error::Io(e)),
    }
}

/// 32 random hex characters
///
/// The cookie is informational only and never checked server-side, so token
/// generation has no failure path.
#[must_use]
pub fn csrf_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `Set-Cookie` value carrying `token`; readable by page script
#[must_use]
pub fn csrf_cookie(token: &str) -> String {
    format!("csrftoken={token}; Path=/; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_32_hex_chars_and_fresh() {
        let a = csrf_token();
        let b = csrf_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn cookie_is_lax_and_script_readable() {
        let cookie = csrf_cookie("abc");
        assert_eq!(cookie, "csrftoken=abc; Path=/; SameSite=Lax");
        assert!(!cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn missing_asset_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_asset(dir.path(), "index.html").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref p) if p == "/index.html"));
    }
}
