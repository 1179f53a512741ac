//! Request correlation.
//!
//! # Responsibilities
//! - Take the request ID from an inbound `x-request-id` header, or generate one
//! - Make it available to handlers through request extensions
//! - Echo it on every response
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Generated IDs are random (UUID v4), no shared counter

use std::fmt;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};
use uuid::Uuid;

/// Correlation header name.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(format!("req_{}", Uuid::new_v4().simple()))
    }

    /// Use the inbound `x-request-id` if it is present and not blank.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Read the request ID attached by [`RequestIdLayer`].
pub trait RequestIdExt {
    fn request_id(&self) -> RequestId;
}

impl<B> RequestIdExt for Request<B> {
    /// Falls back to a fresh ID when the layer is not installed.
    fn request_id(&self) -> RequestId {
        self.extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate)
    }
}

/// Layer that attaches a [`RequestId`] to every request and echoes it back.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let request_id = RequestId::from_headers(request.headers());
        let header = request_id.header_value();
        request.extensions_mut().insert(request_id);

        let future = self.inner.call(request);
        Box::pin(async move {
            let mut response = future.await?;
            if let Some(value) = header {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_inbound_id_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("  abc-123 "));
        assert_eq!(RequestId::from_headers(&headers).as_str(), "abc-123");
    }

    #[test]
    fn test_blank_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("   "));
        let id = RequestId::from_headers(&headers);
        assert!(id.as_str().starts_with("req_"));
        assert_ne!(id, RequestId::generate());
    }

    #[tokio::test]
    async fn test_layer_echoes_id() {
        let app = Router::new()
            .route(
                "/",
                get(|request: Request<Body>| async move { request.request_id().to_string() }),
            )
            .layer(RequestIdLayer);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "given-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "given-id");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"given-id");
    }

    #[tokio::test]
    async fn test_layer_generates_id() {
        let app = Router::new().route("/", get(|| async { "ok" })).layer(RequestIdLayer);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(id.starts_with("req_"));
    }
}
