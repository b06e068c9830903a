//! Logging
//!
//! Lifecycle and access lines go to stdout (or `logging.access_log_file`),
//! warnings and errors to stderr (or `logging.error_log_file`). Before
//! [`init`] runs everything goes to the console.

mod format;
pub mod writer;

pub use format::{AccessLogEntry, LogFormat};

use crate::config::Config;
use std::net::SocketAddr;
use std::path::Path;

/// Open the configured log files, once at startup
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, root: &Path, config: &Config) {
    write_info("======================================");
    write_info("Serving with cross-origin isolation");
    write_info(&format!("Listening on: http://{addr}/"));
    write_info(&format!("Directory: {}", root.display()));
    write_info("Headers: COEP require-corp, COOP same-origin");
    if let Some(workers) = config.server.workers.filter(|&n| n > 0) {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_shutdown(reason: &str) {
    let message = format!("[Shutdown] {reason}, no longer accepting connections");
    write_info(&message);
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// One line per served request
pub fn log_access(entry: &AccessLogEntry, format: LogFormat) {
    write_info(&entry.render(format));
}
