//! Response construction.
//!
//! # Responsibilities
//! - Render gateway errors as canonical error envelopes
//! - Assemble proxied responses from upstream status, headers and body
//!
//! # Design Decisions
//! - Every error response is JSON with the request ID embedded
//! - 405 responses name the accepted method in `Allow`

use axum::body::{Body, Bytes};
use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::error::GatewayError;
use crate::http::request::RequestId;
use crate::proxy::errors::{envelope, ErrorType};

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// JSON response with the given status.
pub fn json_response(status: StatusCode, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, APPLICATION_JSON);
    response
}

/// Canonical error envelope response.
pub fn error_response(status: StatusCode, error_type: ErrorType, message: &str, request_id: &RequestId) -> Response {
    json_response(status, envelope(error_type, message, request_id.as_str()))
}

/// Render a [`GatewayError`] for the client.
pub fn gateway_error_response(err: &GatewayError, request_id: &RequestId) -> Response {
    let mut response = error_response(err.status(), err.error_type(), &err.client_message(), request_id);
    if let GatewayError::MethodNotAllowed { allow, .. } = err {
        if let Ok(value) = HeaderValue::from_str(allow.as_str()) {
            response.headers_mut().insert(ALLOW, value);
        }
    }
    response
}

/// Response relayed from an upstream.
pub fn proxied_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Buffered response whose body is already known to be a JSON error envelope.
pub fn proxied_error_response(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Response {
    headers.insert(CONTENT_TYPE, APPLICATION_JSON);
    proxied_response(status, headers, Body::from(body))
}
