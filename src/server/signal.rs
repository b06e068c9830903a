// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Resolve once SIGINT (Ctrl+C) or SIGTERM is received, returning the
/// signal's name.
///
/// If a handler cannot be registered that signal is never reported; the
/// remaining one still is.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            None
        }
    };

    let terminate = async {
        match sigterm.as_mut() {
            Some(s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger::log_warning(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = interrupt => "SIGINT received",
        () = terminate => "SIGTERM received",
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::log_warning(&format!("Failed to listen for Ctrl+C: {e}"));
        std::future::pending::<()>().await;
    }
    "Ctrl+C received"
}

/// Start the signal handler task
///
/// On the first shutdown signal the reason is logged and `shutdown` is
/// notified. `notify_one` stores a permit, so the accept loop sees it even
/// if it is not waiting at that moment.
pub fn start_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        let reason = wait_for_shutdown_signal().await;
        logger::log_shutdown(reason);
        shutdown.notify_one();
    });
}
