// Connection handling module
// Accepts a TCP connection and serves it on its own task

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::{service_fn, Service};
use hyper::{Method, Request, Version};
use hyper_util::rt::{TokioIo, TokioTimer};

use super::io::{HeadRequests, IsolatedIo};

use crate::config::AppState;
use crate::handler::{cross_origin_isolation, FileServer};
use crate::logger::{self, AccessLogEntry, LogFormat};

/// Accept a connection, enforcing the optional connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. \
                 Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream so hyper's own error responses get the
///    isolation headers too, then in `TokioIo`
/// 2. Configures HTTP/1 connection settings (keep-alive, header timeout)
/// 3. Serves the connection with the header-injecting file server
/// 4. Writes one access log line per response
/// 5. Decrements connection counter when done
fn handle_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let head_requests = HeadRequests::default();
        let io = TokioIo::new(IsolatedIo::new(stream, Arc::clone(&head_requests)));
        let service = cross_origin_isolation(FileServer::new(Arc::clone(&state)));

        let performance = &state.config.performance;
        let mut builder = http1::Builder::new();
        builder
            .keep_alive(performance.keep_alive)
            .title_case_headers(true);
        if performance.header_read_timeout > 0 {
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(Duration::from_secs(performance.header_read_timeout));
        }

        let access_log = state.config.logging.access_log;
        let log_format = LogFormat::from_name(&state.config.logging.access_log_format);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req: Request<Incoming>| {
                let started = Instant::now();
                let entry = access_log_entry(&req, peer_addr);
                let is_head = req.method() == Method::HEAD;
                let response = service.call(req);
                let head_requests = Arc::clone(&head_requests);

                async move {
                    let response = response.await?;
                    if let Ok(mut queue) = head_requests.lock() {
                        queue.push_back(is_head);
                    }
                    if access_log {
                        let mut entry = entry;
                        entry.status = response.status().as_u16();
                        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
                        let micros = started.elapsed().as_micros();
                        entry.request_time_us = u64::try_from(micros).unwrap_or(u64::MAX);
                        logger::log_access(&entry, log_format);
                    }
                    Ok::<_, Infallible>(response)
                }
            }),
        );

        if let Err(err) = conn.await {
            log_connection_failure(&err, peer_addr);
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureLevel {
    /// Client hung up mid-request
    Silent,
    /// Client sent something that is not HTTP/1
    Warning,
    Error,
}

fn failure_level(err: &hyper::Error) -> FailureLevel {
    if err.is_incomplete_message() {
        FailureLevel::Silent
    } else if err.is_parse() {
        FailureLevel::Warning
    } else {
        FailureLevel::Error
    }
}

fn log_connection_failure(err: &hyper::Error, peer_addr: SocketAddr) {
    match failure_level(err) {
        FailureLevel::Silent => {}
        FailureLevel::Warning => {
            logger::log_warning(&format!("Bad request from {peer_addr}: {err}"));
        }
        FailureLevel::Error => logger::log_connection_error(err),
    }
}

fn access_log_entry(req: &Request<Incoming>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
}
