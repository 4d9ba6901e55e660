//! Relay Gate - same-origin forwarding relay for allowlisted APIs

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use relay_gate::{
    cli::{Cli, Command},
    config::{self, Config},
    gateway::Server,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Allowlist) => print_allowlist(),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Print the compiled-in allowlist
fn print_allowlist() -> ExitCode {
    let allowlist = config::allowlist();
    if allowlist.is_empty() {
        println!("Allowlist is empty: every upstream host is permitted.");
    } else {
        for entry in allowlist.entries() {
            println!("{entry}");
        }
    }
    ExitCode::SUCCESS
}

/// Run the relay server
async fn run_server(cli: Cli) -> ExitCode {
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    // CLI overrides
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(dir) = cli.assets_dir {
        config.server.assets_dir = dir;
    }

    let server = match Server::new(config, config::allowlist()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create relay: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Relay error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
