//! Request-path errors.
//!
//! Each variant maps to exactly one client-visible status, error type and
//! message. The `Display` text carries the underlying cause and is meant for
//! logs only; clients get [`GatewayError::client_message`].

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::proxy::adapter::AdapterError;
use crate::proxy::client::ReadError;
use crate::proxy::errors::ErrorType;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("method {got} not allowed, expected {allow}")]
    MethodNotAllowed { got: Method, allow: Method },

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("model is required")]
    ModelRequired,

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("failed to marshal request payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to build upstream request: {0}")]
    Adapter(#[from] AdapterError),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("upstream request failed: {0}")]
    UpstreamRequest(#[source] hyper_util::client::legacy::Error),

    #[error("failed to read upstream response: {0}")]
    UpstreamRead(#[source] ReadError),

    #[error("path {0} is not supported")]
    UnsupportedPath(String),

    #[error("failed to encode response: {0}")]
    ResponseEncode(#[source] serde_json::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BodyRead(_)
            | GatewayError::InvalidJson(_)
            | GatewayError::ModelRequired
            | GatewayError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            GatewayError::Encode(_) | GatewayError::Adapter(_) | GatewayError::ResponseEncode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamRequest(_) | GatewayError::UpstreamRead(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UnsupportedPath(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            GatewayError::UnsupportedPath(_) => ErrorType::NotFoundError,
            e if e.status().is_client_error() => ErrorType::InvalidRequestError,
            _ => ErrorType::ApiError,
        }
    }

    /// The message clients see. Never includes transport error text.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::MethodNotAllowed { .. } => "method not allowed".to_string(),
            GatewayError::BodyTooLarge { .. } => "request body too large".to_string(),
            GatewayError::BodyRead(_) => "failed to read request body".to_string(),
            GatewayError::InvalidJson(_) => "invalid JSON payload".to_string(),
            GatewayError::ModelRequired => "model is required".to_string(),
            GatewayError::UnknownModel(model) => format!("unknown model: {}", model),
            GatewayError::Encode(_) => "failed to marshal request payload".to_string(),
            GatewayError::Adapter(_) => "failed to build upstream request".to_string(),
            GatewayError::UpstreamTimeout(_) => "upstream timeout".to_string(),
            GatewayError::UpstreamRequest(_) => "upstream request failed".to_string(),
            GatewayError::UpstreamRead(_) => "failed to read upstream response".to_string(),
            GatewayError::UnsupportedPath(_) => "path is not supported by this gateway".to_string(),
            GatewayError::ResponseEncode(_) => "failed to encode response".to_string(),
        }
    }

    /// Whether the failure was caused by the gateway or the upstream.
    pub fn is_server_side(&self) -> bool {
        self.status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        let err = GatewayError::UnknownModel(" Sonnet".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), ErrorType::InvalidRequestError);
        assert_eq!(err.client_message(), "unknown model:  Sonnet");

        let err = GatewayError::BodyTooLarge { limit: 10 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.client_message(), "request body too large");

        let err = GatewayError::MethodNotAllowed { got: Method::GET, allow: Method::POST };
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.error_type(), ErrorType::InvalidRequestError);
        assert!(!err.is_server_side());
    }

    #[test]
    fn test_server_errors() {
        let err = GatewayError::UpstreamTimeout("response headers".into());
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.error_type(), ErrorType::ApiError);
        assert_eq!(err.client_message(), "upstream timeout");
        assert!(err.is_server_side());

        let err = GatewayError::Adapter(AdapterError::CannotBeABase("mailto:x".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "failed to build upstream request");

        let err = GatewayError::UpstreamRead(ReadError::Idle(std::time::Duration::from_secs(600)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.client_message(), "failed to read upstream response");
    }

    #[test]
    fn test_unsupported_path() {
        let err = GatewayError::UnsupportedPath("/anthropic/v1/batches".into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), ErrorType::NotFoundError);
        assert_eq!(err.client_message(), "path is not supported by this gateway");
    }
}
