//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Same-origin relay that forwards page requests to allowlisted APIs
#[derive(Parser, Debug)]
#[command(name = "relay-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "RELAY_GATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "RELAY_GATE_HOST")]
    pub host: Option<String>,

    /// Directory holding index.html and app.js
    #[arg(long, env = "RELAY_GATE_ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "RELAY_GATE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "RELAY_GATE_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the relay server (default)
    Serve,

    /// Print the compiled-in host allowlist and exit
    Allowlist,
}
