//! Request proxying engine.
//!
//! # Lifecycle
//! ```text
//! Received → BodyRead → Routed → Dispatched → {Buffered | Streaming} → Complete
//! ```
//! Any step before `Dispatched` can end the request with an error; nothing
//! after it retries.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::http::response::{proxied_error_response, proxied_response};
use crate::observability::metrics;
use crate::proxy::adapter::UpstreamAdapter;
use crate::proxy::client::UpstreamClient;
use crate::proxy::headers::{filter_headers, Direction};
use crate::proxy::models::ModelList;
use crate::proxy::relay::relay;
use crate::routing::RouteTable;

/// Path prefix the gateway is mounted under; stripped before forwarding.
pub const MOUNT_PREFIX: &str = "/anthropic";

/// Payload field that selects the route.
pub const MODEL_FIELD: &str = "model";

const EVENT_STREAM: &str = "text/event-stream";

/// Orchestrates one proxied request at a time; shared by all requests.
#[derive(Debug)]
pub struct ProxyEngine {
    routes: Arc<RouteTable>,
    adapter: Arc<dyn UpstreamAdapter>,
    client: UpstreamClient,
    max_body_bytes: usize,
}

impl ProxyEngine {
    pub fn new(
        routes: Arc<RouteTable>,
        adapter: Arc<dyn UpstreamAdapter>,
        client: UpstreamClient,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            routes,
            adapter,
            client,
            max_body_bytes,
        }
    }

    /// Model list built from the route table.
    pub fn model_list(&self) -> ModelList {
        self.adapter.model_list(self.routes.model_names())
    }

    /// Forward a client request to the upstream selected by its `model` field.
    pub async fn forward(&self, request: Request<Body>, request_id: &RequestId) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();

        let body = read_body(body, self.max_body_bytes).await?;

        let mut payload: Map<String, Value> =
            serde_json::from_slice(&body).map_err(GatewayError::InvalidJson)?;

        let requested = match payload.get(MODEL_FIELD) {
            Some(Value::String(model)) if !model.trim().is_empty() => model.clone(),
            _ => return Err(GatewayError::ModelRequired),
        };

        let route = self
            .routes
            .route_by_model(&requested)
            .ok_or_else(|| GatewayError::UnknownModel(requested.clone()))?;

        payload.insert(MODEL_FIELD.to_string(), Value::String(route.upstream_model.clone()));
        let outbound_body = serde_json::to_vec(&payload).map_err(GatewayError::Encode)?;

        let path = parts.uri.path();
        let upstream_path = path.strip_prefix(MOUNT_PREFIX).unwrap_or(path);
        let uri = self
            .adapter
            .build_upstream_url(&route.api_base, upstream_path, parts.uri.query().unwrap_or(""))?;

        let mut headers = filter_headers(&parts.headers, Direction::ToUpstream);
        // Set by the client from the rewritten body and target.
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);
        self.adapter.apply_auth_headers(&mut headers, route)?;
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(value) = request_id.header_value() {
            headers.insert(X_REQUEST_ID, value);
        }

        tracing::debug!(
            request_id = %request_id,
            model = %requested,
            upstream_model = %route.upstream_model,
            upstream = %uri,
            "Dispatching upstream request"
        );

        let started = Instant::now();
        let upstream = match self.client.send(parts.method, uri, headers, outbound_body).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream(&route.model_name, "transport_error", started);
                return Err(e);
            }
        };

        let status = upstream.status();
        let response_headers = filter_headers(upstream.headers(), Direction::ToClient);

        if is_event_stream(upstream.headers()) {
            metrics::record_upstream(&route.model_name, "stream", started);
            let stream = relay(upstream.into_stream(), request_id.clone());
            return Ok(proxied_response(status, response_headers, Body::from_stream(stream)));
        }

        let bytes = upstream.bytes().await.map_err(GatewayError::UpstreamRead)?;
        metrics::record_upstream(&route.model_name, outcome(status), started);

        if status.as_u16() >= 400 {
            return Ok(self.error_response(status, response_headers, bytes, request_id));
        }

        Ok(proxied_response(status, response_headers, Body::from(bytes)))
    }

    fn error_response(&self, status: StatusCode, mut headers: HeaderMap, body: Bytes, request_id: &RequestId) -> Response {
        let normalized = self.adapter.normalize_upstream_error(status, &body, request_id.as_str());
        if normalized != body {
            headers.remove(CONTENT_ENCODING);
        }

        tracing::warn!(
            request_id = %request_id,
            status = status.as_u16(),
            passthrough = normalized == body,
            "Upstream returned an error"
        );

        proxied_error_response(status, headers, normalized)
    }
}

fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "server_error"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "ok"
    }
}

/// True when the response is an incrementally delivered event stream.
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains(EVENT_STREAM))
        .unwrap_or(false)
}

/// Read the whole body, giving up as soon as it exceeds `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(GatewayError::BodyRead)?;
        if buf.len() + chunk.len() > limit {
            return Err(GatewayError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::adapter::AnthropicCompatibleAdapter;
    use crate::config::schema::UpstreamConfig;
    use crate::routing::{AuthMode, ModelMatcher, Route};

    fn engine(max_body_bytes: usize) -> ProxyEngine {
        let routes = RouteTable::new(
            vec![Route {
                model_name: "sonnet".into(),
                upstream_model: "glm-4.7".into(),
                // Nothing listens here; tests below never reach dispatch.
                api_base: "http://127.0.0.1:9".into(),
                api_key: "target-key".into(),
                auth_mode: AuthMode::Bearer,
            }],
            ModelMatcher::Exact,
        );
        ProxyEngine::new(
            Arc::new(routes),
            Arc::new(AnthropicCompatibleAdapter::new()),
            UpstreamClient::new(&UpstreamConfig::default()),
            max_body_bytes,
        )
    }

    fn post(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/anthropic/v1/messages")
            .body(Body::from(body))
            .unwrap()
    }

    async fn forward_err(engine: &ProxyEngine, body: &'static str) -> GatewayError {
        engine.forward(post(body), &RequestId::from("t")).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let err = forward_err(&engine(8), r#"{"model":"sonnet"}"#).await;
        assert!(matches!(err, GatewayError::BodyTooLarge { limit: 8 }));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let engine = engine(1024);
        assert!(matches!(forward_err(&engine, "{not json").await, GatewayError::InvalidJson(_)));
        assert!(matches!(forward_err(&engine, "[1,2]").await, GatewayError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_model_required() {
        let engine = engine(1024);
        for body in [r#"{}"#, r#"{"model":""}"#, r#"{"model":"   "}"#, r#"{"model":42}"#] {
            assert!(matches!(forward_err(&engine, body).await, GatewayError::ModelRequired), "{}", body);
        }
    }

    #[tokio::test]
    async fn test_unknown_model_keeps_exact_value() {
        let engine = engine(1024);
        match forward_err(&engine, r#"{"model":" sonnet"}"#).await {
            GatewayError::UnknownModel(model) => assert_eq!(model, " sonnet"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_is_event_stream() {
        let mut headers = HeaderMap::new();
        assert!(!is_event_stream(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("Text/Event-Stream; charset=utf-8"));
        assert!(is_event_stream(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_event_stream(&headers));
    }

    #[tokio::test]
    async fn test_read_body_at_limit() {
        let bytes = read_body(Body::from("12345"), 5).await.unwrap();
        assert_eq!(&bytes[..], b"12345");
        assert!(matches!(
            read_body(Body::from("123456"), 5).await,
            Err(GatewayError::BodyTooLarge { limit: 5 })
        ));
    }

    #[test]
    fn test_payload_rewrite_preserves_other_fields() {
        let raw = r#"{"z":1,"model":"sonnet","max_tokens":1024,"temperature":0.70,"big":12345678901234567890123,"a":{"y":1,"x":2}}"#;
        let mut payload: Map<String, Value> = serde_json::from_str(raw).unwrap();
        payload.insert(MODEL_FIELD.to_string(), Value::String("glm-4.7".into()));
        let out = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            out,
            r#"{"z":1,"model":"glm-4.7","max_tokens":1024,"temperature":0.70,"big":12345678901234567890123,"a":{"y":1,"x":2}}"#
        );
    }
}
