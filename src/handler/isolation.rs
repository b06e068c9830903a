//! Response header injection layer
//!
//! Wraps any hyper `Service` and stamps a fixed set of headers onto every
//! response it returns, whatever the status code. Used to opt served pages
//! into cross-origin isolation.

use hyper::header::{HeaderName, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");
pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");

/// Service decorator that sets fixed response headers
#[derive(Debug, Clone)]
pub struct SetResponseHeaders<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S> SetResponseHeaders<S> {
    pub fn new(inner: S, headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self {
            inner,
            headers: headers.into(),
        }
    }
}

/// Wrap a service so every response carries
/// `Cross-Origin-Embedder-Policy: require-corp` and
/// `Cross-Origin-Opener-Policy: same-origin`
pub fn cross_origin_isolation<S>(inner: S) -> SetResponseHeaders<S> {
    SetResponseHeaders::new(
        inner,
        vec![
            (
                CROSS_ORIGIN_EMBEDDER_POLICY,
                HeaderValue::from_static("require-corp"),
            ),
            (
                CROSS_ORIGIN_OPENER_POLICY,
                HeaderValue::from_static("same-origin"),
            ),
        ],
    )
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SetResponseHeaders<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<ReqBody>) -> Self::Future {
        let future = self.inner.call(req);
        let headers = Arc::clone(&self.headers);

        Box::pin(async move {
            let mut response = future.await?;
            let response_headers = response.headers_mut();
            // insert, not append: exactly one value per name
            for (name, value) in headers.iter() {
                response_headers.insert(name.clone(), value.clone());
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Empty, Full};
    use hyper::body::Bytes;
    use hyper::service::service_fn;
    use hyper::StatusCode;
    use std::convert::Infallible;

    fn request() -> Request<Empty<Bytes>> {
        Request::builder()
            .uri("/anything")
            .body(Empty::new())
            .unwrap()
    }

    async fn call_with_status(status: StatusCode) -> Response<Full<Bytes>> {
        let inner = service_fn(move |_req: Request<Empty<Bytes>>| async move {
            let mut response = Response::new(Full::new(Bytes::from_static(b"body")));
            *response.status_mut() = status;
            let headers = response.headers_mut();
            headers.insert("content-type", HeaderValue::from_static("text/plain"));
            Ok::<_, Infallible>(response)
        });
        cross_origin_isolation(inner).call(request()).await.unwrap()
    }

    #[tokio::test]
    async fn test_headers_added_for_every_status() {
        for status in [
            StatusCode::OK,
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::NOT_MODIFIED,
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::NOT_IMPLEMENTED,
        ] {
            let response = call_with_status(status).await;
            assert_eq!(response.status(), status);
            let headers = response.headers();
            assert_eq!(headers["Cross-Origin-Embedder-Policy"], "require-corp");
            assert_eq!(headers["Cross-Origin-Opener-Policy"], "same-origin");
        }
    }

    #[tokio::test]
    async fn test_existing_headers_preserved() {
        let response = call_with_status(StatusCode::OK).await;
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.headers().len(), 3);
    }

    #[tokio::test]
    async fn test_inner_value_replaced_not_duplicated() {
        let inner = service_fn(|_req: Request<Empty<Bytes>>| async {
            let mut response = Response::new(Full::new(Bytes::new()));
            let opener = HeaderValue::from_static("unsafe-none");
            let headers = response.headers_mut();
            headers.insert(CROSS_ORIGIN_OPENER_POLICY, opener);
            Ok::<_, Infallible>(response)
        });
        let service = cross_origin_isolation(inner);
        let response = service.call(request()).await.unwrap();
        let values: Vec<_> = response
            .headers()
            .get_all(CROSS_ORIGIN_OPENER_POLICY)
            .iter()
            .collect();
        assert_eq!(values, vec!["same-origin"]);
    }
}
