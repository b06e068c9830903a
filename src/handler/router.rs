//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, then hand-off
//! to static file serving. Exposed as a hyper `Service` so it can be wrapped
//! by response layers.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, SERVER};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path component of the request target, still percent-encoded
    pub path: String,
    pub query: Option<String>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
    pub has_if_none_match: bool,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let headers = req.headers();
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            is_head: req.method() == Method::HEAD,
            if_modified_since: headers
                .get("if-modified-since")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            has_if_none_match: headers.contains_key("if-none-match"),
        }
    }
}

/// Static file server as a hyper service
///
/// Request bodies are never read, so any body type is accepted.
#[derive(Clone)]
pub struct FileServer {
    state: Arc<AppState>,
}

impl FileServer {
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl<B> Service<Request<B>> for FileServer {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let ctx = RequestContext::from_request(&req);
        let state = Arc::clone(&self.state);
        Box::pin(async move { Ok(handle_request(&ctx, &state).await) })
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(ctx: &RequestContext, state: &AppState) -> Response<Full<Bytes>> {
    // 1. Check HTTP method
    let response = match check_http_method(&ctx.method) {
        Some(resp) => resp,
        // 2. Serve from the filesystem
        None => static_files::serve(ctx, state).await,
    };

    with_server_header(response, &state.config.http.server_name)
}

/// Only GET and HEAD are served; everything else is 501
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            Some(http::build_error_response(
                StatusCode::NOT_IMPLEMENTED,
                &format!("Unsupported method ('{method}')"),
                false,
            ))
        }
    }
}

fn with_server_header(
    mut response: Response<Full<Bytes>>,
    server_name: &str,
) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(_) => logger::log_warning(&format!(
            "Invalid server name '{server_name}', header skipped"
        )),
    }
    response
}
