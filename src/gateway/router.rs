//! HTTP router and handlers

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderValue, Uri, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error};

use super::assets::{index_handler, script_handler};
use super::boundary::same_origin_json;
use crate::Error;
use crate::gate::{ForwardGate, ForwardRequest, ForwardResponse};

/// Content-Security-Policy sent with every response
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self'; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self'; \
    connect-src 'self' https:; \
    base-uri 'none'; \
    form-action 'self'";

/// Shared application state
pub struct AppState {
    /// Forwarding gate (owns the allowlist and HTTP client)
    pub gate: ForwardGate,
    /// Timeout for requests that do not specify one
    pub default_timeout: Duration,
    /// Directory holding the page and its script
    pub assets_dir: PathBuf,
    /// Maximum inbound body size (bytes)
    pub max_body_size: usize,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let forwarding = Router::new()
        .route("/proxy", post(proxy_handler))
        .route_layer(middleware::from_fn(same_origin_json));

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/app.js", get(script_handler))
        .merge(forwarding)
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(state.max_body_size));

    with_response_layers(app).with_state(state)
}

/// Panic recovery, then the security headers, then tracing.
///
/// The headers sit outside the panic layer so a recovered 500 carries them too.
fn with_response_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(TraceLayer::new_for_http())
}

/// POST /proxy handler
async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Unreadable forward request body");
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    match ForwardRequest::from_json_slice(&body, state.default_timeout) {
        Ok(request) => state.gate.forward(request).await.into_response(),
        Err(err) => {
            debug!(error = %err, "Malformed forward request");
            ForwardResponse::rejected(&err).into_response()
        }
    }
}

async fn not_found_handler(uri: Uri) -> Response {
    Error::NotFound(uri.path().to_string()).into_response()
}

fn panic_response(_payload: Box<dyn Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    Error::Internal("unexpected server error".to_string()).into_response()
}
