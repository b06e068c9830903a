//! HTTP response building module
//!
//! Provides builders for the responses a static file server emits,
//! decoupled from path resolution and filesystem access.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::encoding::escape_html;

/// Build 200 OK response for a file
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    last_modified: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Last-Modified", last_modified)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("Last-Modified", last_modified)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            status_only(StatusCode::NOT_MODIFIED)
        })
}

/// Build 301 redirect response (directory without trailing slash)
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header("Location", location)
        .header("Content-Length", 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            status_only(StatusCode::MOVED_PERMANENTLY)
        })
}

/// Build an HTML error page for any status code
///
/// The body is left empty for HEAD requests; headers are unchanged.
pub fn build_error_response(
    status: StatusCode,
    message: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let page = render_error_page(status, message);
    let content_length = page.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(page)
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            status_only(status)
        })
}

fn render_error_page(status: StatusCode, message: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{code} {reason}</title>
</head>
<body>
<h1>{code} {reason}</h1>
<p>{message}</p>
</body>
</html>
"#,
        code = status.as_u16(),
        reason = escape_html(reason),
        message = escape_html(message),
    )
}

fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_page_escapes_message() {
        let message = "Unsupported method ('<X>')";
        let response = build_error_response(StatusCode::NOT_IMPLEMENTED, message, false);
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let page = render_error_page(StatusCode::NOT_IMPLEMENTED, message);
        assert!(page.contains("501 Not Implemented"));
        assert!(page.contains("&lt;X&gt;"));
        assert!(!page.contains("<X>"));
    }

    #[test]
    fn test_head_error_keeps_content_length() {
        let get = build_error_response(StatusCode::NOT_FOUND, "File not found", false);
        let head = build_error_response(StatusCode::NOT_FOUND, "File not found", true);
        assert_eq!(
            get.headers().get("Content-Length"),
            head.headers().get("Content-Length")
        );
    }

    #[test]
    fn test_redirect_response() {
        let response = build_redirect_response("/docs/");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers().get("Location").unwrap(), "/docs/");
        assert_eq!(response.headers().get("Content-Length").unwrap(), "0");
    }

    #[test]
    fn test_file_response_headers() {
        let response = build_file_response(
            Bytes::from_static(b"body"),
            "text/plain; charset=utf-8",
            "Sun, 06 Nov 1994 08:49:37 GMT",
            true,
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Content-Length").unwrap(), "4");
        assert_eq!(
            response.headers().get("Last-Modified").unwrap(),
            "Sun, 06 Nov 1994 08:49:37 GMT"
        );
    }
}
