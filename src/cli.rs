//! Command line interface
//!
//! Mirrors the shape of a classic `http.server`-style invocation:
//!
//! ```bash
//! coi-serve                      # 0.0.0.0:8000, current directory
//! coi-serve 9000 --bind 127.0.0.1 --directory ./dist
//! COI_PORT=9000 coi-serve
//! ```

use clap::Parser;

use crate::config::DEFAULT_CONFIG_FILE;

/// Serve a directory over HTTP with cross-origin isolation headers
#[derive(Debug, Clone, Parser)]
#[command(name = "coi-serve")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(env = "COI_PORT")]
    pub port: Option<u16>,

    /// Address to bind (all interfaces by default)
    #[arg(short, long, env = "COI_BIND")]
    pub bind: Option<String>,

    /// Directory to serve (current directory by default)
    #[arg(short, long, env = "COI_DIRECTORY")]
    pub directory: Option<String>,

    /// Configuration file, extension optional
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "COI_CONFIG")]
    pub config: String,
}
