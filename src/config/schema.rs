//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default listen address when none is configured.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:4000";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:4000" or ":4000").
    pub listen: String,

    /// Logical model routes.
    pub model_list: Vec<ModelRouteConfig>,

    /// Upstream client timeouts.
    pub upstream: UpstreamConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Route lookup behaviour.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            model_list: Vec::new(),
            upstream: UpstreamConfig::default(),
            limits: LimitsConfig::default(),
            routing: RoutingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Listen address in a form `TcpListener::bind` accepts.
    ///
    /// A bare `:port` binds on all interfaces.
    pub fn bind_address(&self) -> String {
        let listen = self.listen.trim();
        if listen.starts_with(':') {
            format!("0.0.0.0{}", listen)
        } else {
            listen.to_string()
        }
    }
}

/// One logical model exposed by the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelRouteConfig {
    /// Name clients put in the `model` field.
    pub model_name: String,

    /// Where and how to reach the upstream.
    pub params: UpstreamParams,
}

/// Upstream endpoint and credential for a route.
#[derive(Clone, Deserialize, Serialize, Default)]
pub struct UpstreamParams {
    /// Real model identifier sent upstream.
    #[serde(default)]
    pub model: String,

    /// Base URL of the upstream API (http/https).
    #[serde(default)]
    pub api_base: String,

    /// Credential injected on every upstream request.
    #[serde(default)]
    pub api_key: String,

    /// "x-api-key" (default) or "bearer".
    #[serde(default)]
    pub auth_type: String,
}

impl std::fmt::Debug for UpstreamParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamParams")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("auth_type", &self.auth_type)
            .finish()
    }
}

/// Timeouts for the upstream HTTP client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Time allowed between sending the request and receiving response headers.
    pub response_header_timeout_secs: u64,

    /// Idle time allowed between two reads of the response body.
    pub read_timeout_secs: u64,

    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            response_header_timeout_secs: 600,
            read_timeout_secs: 600,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 32 * 1024 * 1024, // 32MB
        }
    }
}

/// Route lookup behaviour.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Trim whitespace from the requested model name before lookup.
    ///
    /// Configured names are always trimmed. Off by default, so `" sonnet"`
    /// does not match `sonnet`.
    pub trim_model_lookup: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[model_list]]
            model_name = "sonnet"
            [model_list.params]
            model = "glm-4.7"
            api_base = "https://api.example.com"
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.model_list.len(), 1);
        assert_eq!(config.model_list[0].params.auth_type, "");
        assert_eq!(config.upstream.connect_timeout_secs, 30);
        assert!(!config.routing.trim_model_lookup);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bind_address_shorthand() {
        let mut config = GatewayConfig::default();
        config.listen = ":4100".into();
        assert_eq!(config.bind_address(), "0.0.0.0:4100");

        config.listen = "127.0.0.1:4100".into();
        assert_eq!(config.bind_address(), "127.0.0.1:4100");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let params = UpstreamParams {
            api_key: "super-secret".into(),
            ..Default::default()
        };
        let rendered = format!("{:?}", params);
        assert!(!rendered.contains("super-secret"));
    }
}
