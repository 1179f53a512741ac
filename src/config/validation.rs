//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile `model_list` entries into routes
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Detect duplicate model names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure: GatewayConfig → Result<_, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderValue;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, ModelRouteConfig};
use crate::routing::{AuthMode, Route};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listen address is required")]
    MissingListen,

    #[error("model_list is required")]
    EmptyModelList,

    #[error("model_list[{index}].model_name is required")]
    MissingModelName { index: usize },

    #[error("duplicate model_name: {0}")]
    DuplicateModelName(String),

    #[error("model_list[{index}].params.{field} is required")]
    MissingParam { index: usize, field: &'static str },

    #[error("model_list[{index}].params.api_base is invalid: {value}")]
    InvalidApiBase { index: usize, value: String },

    #[error("model_list[{index}].params.api_base must use http/https")]
    UnsupportedScheme { index: usize },

    #[error("model_list[{index}].params.api_key contains characters not allowed in a header")]
    InvalidApiKey { index: usize },

    #[error("model_list[{index}].params.auth_type must be x-api-key or bearer")]
    InvalidAuthType { index: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate the whole configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listen.trim().is_empty() {
        errors.push(ValidationError::MissingListen);
    }

    let upstream = &config.upstream;
    for (value, name) in [
        (upstream.connect_timeout_secs, "upstream.connect_timeout_secs"),
        (upstream.response_header_timeout_secs, "upstream.response_header_timeout_secs"),
        (upstream.read_timeout_secs, "upstream.read_timeout_secs"),
        (upstream.pool_idle_timeout_secs, "upstream.pool_idle_timeout_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    if let Err(route_errors) = compile_routes(&config.model_list) {
        errors.extend(route_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check `model_list` and turn it into routes.
///
/// Names are trimmed and auth types lowercased here; lookups never see the
/// raw config strings.
pub fn compile_routes(model_list: &[ModelRouteConfig]) -> Result<Vec<Route>, Vec<ValidationError>> {
    if model_list.is_empty() {
        return Err(vec![ValidationError::EmptyModelList]);
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut routes = Vec::with_capacity(model_list.len());

    for (index, entry) in model_list.iter().enumerate() {
        let before = errors.len();
        let params = &entry.params;

        let model_name = entry.model_name.trim();
        if model_name.is_empty() {
            errors.push(ValidationError::MissingModelName { index });
        } else if !seen.insert(model_name.to_string()) {
            errors.push(ValidationError::DuplicateModelName(model_name.to_string()));
        }

        if params.model.trim().is_empty() {
            errors.push(ValidationError::MissingParam { index, field: "model" });
        }

        if params.api_base.trim().is_empty() {
            errors.push(ValidationError::MissingParam { index, field: "api_base" });
        } else {
            match Url::parse(&params.api_base) {
                Ok(url) if !url.has_host() => {
                    errors.push(ValidationError::InvalidApiBase {
                        index,
                        value: params.api_base.clone(),
                    });
                }
                Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                    errors.push(ValidationError::UnsupportedScheme { index });
                }
                Ok(_) => {}
                Err(_) => {
                    errors.push(ValidationError::InvalidApiBase {
                        index,
                        value: params.api_base.clone(),
                    });
                }
            }
        }

        if params.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingParam { index, field: "api_key" });
        } else if HeaderValue::from_str(&format!("Bearer {}", params.api_key)).is_err() {
            errors.push(ValidationError::InvalidApiKey { index });
        }

        let auth_mode = params.auth_type.parse::<AuthMode>();
        if auth_mode.is_err() {
            errors.push(ValidationError::InvalidAuthType { index });
        }

        if errors.len() > before {
            continue;
        }

        if let Ok(auth_mode) = auth_mode {
            routes.push(Route {
                model_name: model_name.to_string(),
                upstream_model: params.model.clone(),
                api_base: params.api_base.clone(),
                api_key: params.api_key.clone(),
                auth_mode,
            });
        }
    }

    if errors.is_empty() {
        Ok(routes)
    } else {
        Err(errors)
    }
}
