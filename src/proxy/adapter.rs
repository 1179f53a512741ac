//! Upstream protocol adapters.
//!
//! An adapter knows how a particular upstream protocol addresses endpoints,
//! authenticates, and reports errors. The engine only talks to the
//! [`UpstreamAdapter`] trait, so another protocol can be plugged in without
//! touching request orchestration.

use axum::body::Bytes;
use axum::http::header::AUTHORIZATION;
use axum::http::uri::InvalidUri;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use chrono::Utc;
use thiserror::Error;
use url::{Position, Url};

use crate::proxy::errors::normalize_upstream_error;
use crate::proxy::headers::X_API_KEY;
use crate::proxy::models::ModelList;
use crate::routing::{AuthMode, Route};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("parse api_base: {0}")]
    InvalidBase(#[from] url::ParseError),

    #[error("api_base cannot carry a path: {0}")]
    CannotBeABase(String),

    #[error("upstream uri: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("credential for model {0} is not a valid header value")]
    InvalidCredential(String),
}

/// Translation between the gateway and one upstream protocol.
pub trait UpstreamAdapter: Send + Sync + std::fmt::Debug {
    /// Join `base` and `path`, attaching `query` verbatim.
    fn build_upstream_url(&self, base: &str, path: &str, query: &str) -> Result<Uri, AdapterError>;

    /// Replace whatever credentials `headers` carries with the route's.
    fn apply_auth_headers(&self, headers: &mut HeaderMap, route: &Route) -> Result<(), AdapterError>;

    /// Shape a failed upstream response into the canonical error envelope.
    fn normalize_upstream_error(&self, status: StatusCode, body: &Bytes, request_id: &str) -> Bytes;

    /// Model list for the configured names.
    fn model_list(&self, names: &[String]) -> ModelList {
        ModelList::from_names(names, Utc::now())
    }
}

/// Adapter for upstreams that speak the Anthropic Messages wire protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicCompatibleAdapter;

impl AnthropicCompatibleAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl UpstreamAdapter for AnthropicCompatibleAdapter {
    fn build_upstream_url(&self, base: &str, path: &str, query: &str) -> Result<Uri, AdapterError> {
        let base_url = Url::parse(base)?;
        if base_url.cannot_be_a_base() {
            return Err(AdapterError::CannotBeABase(base.to_string()));
        }

        // The query is appended as raw text: `Url` would re-encode it.
        let mut target = format!(
            "{}{}/{}",
            &base_url[..Position::AfterPort],
            base_url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if !query.is_empty() {
            target.push('?');
            target.push_str(query);
        }
        Ok(Uri::try_from(target)?)
    }

    fn apply_auth_headers(&self, headers: &mut HeaderMap, route: &Route) -> Result<(), AdapterError> {
        headers.remove(AUTHORIZATION);
        headers.remove(X_API_KEY);

        let invalid = |_| AdapterError::InvalidCredential(route.model_name.clone());
        match route.auth_mode {
            AuthMode::Bearer => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", route.api_key)).map_err(invalid)?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            AuthMode::ApiKey => {
                let mut value = HeaderValue::from_str(&route.api_key).map_err(invalid)?;
                value.set_sensitive(true);
                headers.insert(X_API_KEY, value);
            }
        }
        Ok(())
    }

    fn normalize_upstream_error(&self, status: StatusCode, body: &Bytes, request_id: &str) -> Bytes {
        normalize_upstream_error(status, body, request_id)
    }
}
