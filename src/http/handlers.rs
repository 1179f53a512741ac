//! Endpoint handlers.
//!
//! Method checks happen here rather than in the router so that a wrong
//! method still gets a canonical error envelope.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::GatewayError;
use crate::http::request::{RequestId, RequestIdExt};
use crate::http::response::{gateway_error_response, json_response};
use crate::http::server::AppState;

/// Liveness check.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `POST /anthropic/v1/messages`, streaming-capable.
pub async fn messages(State(state): State<AppState>, request: Request<Body>) -> Response {
    proxy(state, request).await
}

/// `POST /anthropic/v1/messages/count_tokens`.
pub async fn count_tokens(State(state): State<AppState>, request: Request<Body>) -> Response {
    proxy(state, request).await
}

/// `GET /anthropic/v1/models`, answered from the route table.
pub async fn models(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request.request_id();
    if let Err(err) = ensure_method(&request, Method::GET) {
        return reject(err, &request_id);
    }

    match serde_json::to_vec(&state.engine.model_list()) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => reject(GatewayError::ResponseEncode(e), &request_id),
    }
}

/// Anything else under the mount prefix.
pub async fn unsupported(request: Request<Body>) -> Response {
    let request_id = request.request_id();
    reject(GatewayError::UnsupportedPath(request.uri().path().to_string()), &request_id)
}

async fn proxy(state: AppState, request: Request<Body>) -> Response {
    let request_id = request.request_id();
    if let Err(err) = ensure_method(&request, Method::POST) {
        return reject(err, &request_id);
    }

    match state.engine.forward(request, &request_id).await {
        Ok(response) => response,
        Err(err) => reject(err, &request_id),
    }
}

fn ensure_method<B>(request: &Request<B>, allow: Method) -> Result<(), GatewayError> {
    if request.method() == allow {
        Ok(())
    } else {
        Err(GatewayError::MethodNotAllowed {
            got: request.method().clone(),
            allow,
        })
    }
}

fn reject(err: GatewayError, request_id: &RequestId) -> Response {
    if err.is_server_side() {
        tracing::error!(request_id = %request_id, error = %err, "Request failed");
    } else {
        tracing::debug!(request_id = %request_id, error = %err, "Request rejected");
    }
    gateway_error_response(&err, request_id)
}
