//! Canonical error envelope and upstream error normalization.
//!
//! Every error the gateway returns has the shape
//! `{"type":"error","error":{"type":..,"message":..},"request_id":..}`.
//! Upstream failures that already use this shape are passed through untouched;
//! anything else is rewritten into it.

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when nothing better can be found.
pub const FALLBACK_MESSAGE: &str = "request failed";

/// The `error.type` values the gateway produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    InvalidRequestError,
    NotFoundError,
    ApiError,
}

impl ErrorType {
    /// Classification for an upstream failure status.
    pub fn for_status(status: StatusCode) -> Self {
        if status.as_u16() >= 500 {
            ErrorType::ApiError
        } else {
            ErrorType::InvalidRequestError
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    error: Inner<'a>,
    #[serde(skip_serializing_if = "str::is_empty")]
    request_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Inner<'a> {
    #[serde(rename = "type")]
    kind: ErrorType,
    message: &'a str,
}

/// Serialize a canonical envelope. A blank message becomes [`FALLBACK_MESSAGE`].
pub fn envelope(error_type: ErrorType, message: &str, request_id: &str) -> Bytes {
    let message = if message.trim().is_empty() {
        FALLBACK_MESSAGE
    } else {
        message
    };
    let payload = Envelope {
        kind: "error",
        error: Inner {
            kind: error_type,
            message,
        },
        request_id,
    };
    match serde_json::to_vec(&payload) {
        Ok(body) => Bytes::from(body),
        Err(_) => Bytes::from_static(
            br#"{"type":"error","error":{"type":"api_error","message":"failed to marshal error"}}"#,
        ),
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CanonicalShape {
    #[serde(rename = "type")]
    kind: String,
    error: CanonicalInnerShape,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CanonicalInnerShape {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// True when `body` already is a canonical error envelope.
pub fn is_canonical_error(body: &[u8]) -> bool {
    if body.is_empty() {
        return false;
    }
    match serde_json::from_slice::<CanonicalShape>(body) {
        Ok(parsed) => {
            parsed.kind == "error"
                && !parsed.error.kind.trim().is_empty()
                && !parsed.error.message.trim().is_empty()
        }
        Err(_) => false,
    }
}

/// Turn an upstream failure into canonical envelope bytes.
///
/// Canonical bodies are returned byte for byte, whatever the status.
pub fn normalize_upstream_error(status: StatusCode, body: &Bytes, request_id: &str) -> Bytes {
    if is_canonical_error(body) {
        return body.clone();
    }

    let mut message = extract_message(body);
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or_default().to_string();
    }
    envelope(ErrorType::for_status(status), &message, request_id)
}

/// Best-effort human message from an arbitrary error body.
fn extract_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let Ok(Value::Object(object)) = serde_json::from_slice::<Value>(body) else {
        return trimmed.to_string();
    };

    let non_blank = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_blank(object.get("message"))
        .or_else(|| non_blank(object.get("error").and_then(|e| e.get("message"))))
        .unwrap_or_else(|| trimmed.to_string())
}
