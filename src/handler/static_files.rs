//! Static file serving module
//!
//! Resolves request paths against the served root and builds file,
//! directory listing, redirect and error responses.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::path::{self, RequestPath};
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

/// Serve a GET/HEAD request from the root directory
pub async fn serve(ctx: &RequestContext, state: &AppState) -> Response<Full<Bytes>> {
    let request_path = match RequestPath::parse(&ctx.path) {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!("Bad request path '{}': {e}", ctx.path));
            return http::build_error_response(
                StatusCode::BAD_REQUEST,
                &e.to_string(),
                ctx.is_head,
            );
        }
    };

    let target = request_path.resolve(&state.root);

    if !state.config.http.follow_symlinks && !path::is_within_root(&target, &state.root).await {
        return not_found(ctx);
    }

    // Any failure to locate the path is a plain 404
    let Ok(metadata) = fs::metadata(&target).await else {
        return not_found(ctx);
    };

    if metadata.is_dir() {
        return serve_directory(ctx, state, &request_path, &target).await;
    }

    if request_path.trailing_slash || !metadata.is_file() {
        return not_found(ctx);
    }

    serve_file(ctx, &target, &metadata).await
}

/// Redirect, index file, or listing for a directory
async fn serve_directory(
    ctx: &RequestContext,
    state: &AppState,
    request_path: &RequestPath,
    dir: &Path,
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(ref query) => format!("{}/?{query}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_redirect_response(&location);
    }

    for index_file in &state.config.http.index_files {
        let index_path = dir.join(index_file);
        if let Ok(metadata) = fs::metadata(&index_path).await {
            if metadata.is_file() {
                return serve_file(ctx, &index_path, &metadata).await;
            }
        }
    }

    match listing::read_entries(dir).await {
        Ok(entries) => {
            let html = listing::render(&request_path.decoded, &entries);
            http::build_html_response(html, ctx.is_head)
        }
        Err(e) => {
            logger::log_warning(&format!("Cannot list directory '{}': {e}", dir.display()));
            http::build_error_response(
                StatusCode::NOT_FOUND,
                "No permission to list directory",
                ctx.is_head,
            )
        }
    }
}

/// Serve a regular file, honouring If-Modified-Since
async fn serve_file(
    ctx: &RequestContext,
    file_path: &Path,
    metadata: &Metadata,
) -> Response<Full<Bytes>> {
    let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
    let last_modified = cache::format_http_date(modified);

    // If-None-Match takes precedence; without ETags it never matches
    if !ctx.has_if_none_match
        && cache::is_not_modified(modified, ctx.if_modified_since.as_deref())
    {
        return http::build_304_response(&last_modified);
    }

    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            return not_found(ctx);
        }
        Err(e) => {
            let path = file_path.display();
            logger::log_error(&format!("Failed to read file '{path}': {e}"));
            return http::build_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error reading file",
                ctx.is_head,
            );
        }
    };

    // Determine content type from extension
    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));

    http::build_file_response(
        Bytes::from(content),
        content_type,
        &last_modified,
        ctx.is_head,
    )
}

fn not_found(ctx: &RequestContext) -> Response<Full<Bytes>> {
    http::build_error_response(StatusCode::NOT_FOUND, "File not found", ctx.is_head)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use hyper::Method;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context(path: &str) -> RequestContext {
        RequestContext {
            method: Method::GET,
            path: path.to_string(),
            query: None,
            is_head: false,
            if_modified_since: None,
            has_if_none_match: false,
        }
    }

    fn setup(name: &str, follow_symlinks: bool) -> (PathBuf, Arc<AppState>) {
        let base = std::env::temp_dir().join(format!("coi-static-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&base);
        let root = base.join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(base.join("outside.txt"), "secret").unwrap();
        symlink(base.join("outside.txt"), root.join("link.txt")).unwrap();

        let mut config = Config::defaults().unwrap();
        config.server.root = root.to_string_lossy().into_owned();
        config.http.follow_symlinks = follow_symlinks;
        (base, Arc::new(AppState::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_symlink_followed_by_default() {
        let (base, state) = setup("follow", true);
        let response = serve(&context("/link.txt"), &state).await;
        assert_eq!(response.status(), StatusCode::OK);
        std::fs::remove_dir_all(base).unwrap();
    }

    #[tokio::test]
    async fn test_symlink_outside_root_blocked() {
        let (base, state) = setup("nofollow", false);
        let response = serve(&context("/link.txt"), &state).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        std::fs::remove_dir_all(base).unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_file_is_404() {
        let (base, state) = setup("unreadable", true);
        let file = state.root.join("locked.txt");
        std::fs::write(&file, "locked").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything, so only assert when the read is refused
        if std::fs::read(&file).is_err() {
            let response = serve(&context("/locked.txt"), &state).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        std::fs::remove_dir_all(base).unwrap();
    }
}
