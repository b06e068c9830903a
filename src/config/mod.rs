// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::{SocketAddr, ToSocketAddrs};

use crate::cli::Cli;
use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Config file looked up when `--config` is not given (extension optional)
pub const DEFAULT_CONFIG_FILE: &str = "coi-serve";

/// Environment variable prefix, e.g. `COI_SERVER__PORT=9000`
const ENV_PREFIX: &str = "COI";

fn builder_with_defaults(
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("server.root", ".")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "common")?
        .set_default(
            "http.server_name",
            concat!("coi-serve/", env!("CARGO_PKG_VERSION")),
        )?
        .set_default("http.index_files", vec!["index.html", "index.htm"])?
        .set_default("http.follow_symlinks", true)?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.header_read_timeout", 30)
}

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// Missing file is fine: defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = builder_with_defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self, config::ConfigError> {
        builder_with_defaults()?.build()?.try_deserialize()
    }

    /// Command line flags take precedence over every other source
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(ref bind) = cli.bind {
            self.server.host.clone_from(bind);
        }
        if let Some(ref directory) = cli.directory {
            self.server.root.clone_from(directory);
        }
    }

    /// Resolve `server.host` and `server.port` into a socket address
    ///
    /// An empty host means all interfaces. Bare IPv6 literals (`::`) and
    /// host names (`localhost`) are accepted.
    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let host = self.server.host.trim();
        let host = if host.is_empty() { "0.0.0.0" } else { host };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = self.server.port;

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ServerError::InvalidAddress(format!("{host}:{port}")))
    }
}
