//! Static file server for local development that opts every response into
//! cross-origin isolation (`Cross-Origin-Embedder-Policy: require-corp`,
//! `Cross-Origin-Opener-Policy: same-origin`), so pages can use
//! `SharedArrayBuffer` and threaded WebAssembly.
//!
//! The binary wires these modules together; integration tests drive them
//! directly.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
