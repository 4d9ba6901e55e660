//! Relay server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use super::router::{AppState, create_router};
use crate::config::Config;
use crate::gate::{Allowlist, ForwardGate};
use crate::{Error, Result};

/// Relay server
pub struct Server {
    /// Configuration
    config: Config,
    /// Forwarding gate
    gate: ForwardGate,
}

impl Server {
    /// Create a new server enforcing `allowlist`
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: Config, allowlist: Allowlist) -> Result<Self> {
        let gate = ForwardGate::new(allowlist)?;
        Ok(Self { config, gate })
    }

    /// Address the server will bind to
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configured host is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip = self
            .config
            .server
            .host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid host: {e}")))?;
        Ok(SocketAddr::new(ip, self.config.server.port))
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = self.bind_addr()?;

        let state = Arc::new(AppState {
            gate: self.gate,
            default_timeout: self.config.forward.default_timeout,
            assets_dir: self.config.server.assets_dir.clone(),
            max_body_size: self.config.server.max_body_size,
        });
        let allowlist = state.gate.allowlist().clone();

        let app = create_router(state);
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;

        info!("============================================================");
        info!("RELAY GATE v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %local.ip(), port = %local.port(), "Listening");
        info!("Open http://{local}");
        info!(assets = %self.config.server.assets_dir.display(), "Serving page assets");

        if allowlist.is_empty() {
            warn!("ALLOWLIST empty - every upstream host is reachable through /proxy");
        } else {
            info!("Allowed upstream hosts:");
            for entry in allowlist.entries() {
                info!("  {entry}");
            }
        }
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Relay stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_uses_configured_host_and_port() {
        let mut config = Config::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 9123;
        let server = Server::new(config, Allowlist::permit_all()).unwrap();
        assert_eq!(server.bind_addr().unwrap(), "0.0.0.0:9123".parse().unwrap());
    }

    #[test]
    fn hostname_bind_is_config_error() {
        let mut config = Config::default();
        config.server.host = "localhost".to_string();
        let server = Server::new(config, Allowlist::permit_all()).unwrap();
        assert!(matches!(server.bind_addr(), Err(Error::Config(_))));
    }
}
