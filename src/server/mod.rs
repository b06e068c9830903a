// Server module entry point
// Binds the listener, runs the accept loop and stops on shutdown signals

pub mod connection;
mod io;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::logger;

// Re-export commonly used items
pub use listener::{bind, create_listener};
pub use server_loop::start_server_loop as serve;
pub use signal::{start_signal_handler, wait_for_shutdown_signal};

/// Run the server until SIGINT or SIGTERM
///
/// Resolves the served directory and the listen address, binds once and
/// accepts connections. Any failure before the accept loop starts is
/// returned to the caller as fatal.
pub async fn start(config: Config) -> Result<(), ServerError> {
    let addr = config.get_socket_addr()?;
    let state = Arc::new(AppState::new(config)?);
    let listener = bind(addr)?;

    let local_addr = listener.local_addr()?;
    logger::log_server_start(&local_addr, &state.root, &state.config);

    let shutdown = Arc::new(Notify::new());
    start_signal_handler(Arc::clone(&shutdown));

    serve(listener, state, shutdown).await;
    Ok(())
}
