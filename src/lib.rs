//! Relay Gate Library
//!
//! A same-origin forwarding relay. A page served by the relay posts a
//! description of an HTTP call to `/proxy`; the relay checks it, makes the
//! call to an allowlisted upstream and hands back a normalized envelope.
//!
//! # Features
//!
//! - **Host allowlist**: exact names and `*.domain` wildcards, first match wins
//! - **Boundary checks**: JSON-only, same-origin `POST /proxy`
//! - **Credential hygiene**: caller headers reach upstream untouched, but are
//!   redacted from failure echoes
//! - **Bounded calls**: per-request timeout covering the whole exchange
//! - **Security headers**: nosniff, no-referrer and a strict CSP on every response

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod gateway;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
    }
}
