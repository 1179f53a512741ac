//! Access logging.
//! Emits one event per request and feeds request metrics.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::http::request::RequestIdExt;
use crate::observability::metrics;

pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request.request_id();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        method = %method,
        path = %path,
        status,
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "http request"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}
