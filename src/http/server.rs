//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile routes and build the proxy engine from config
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, access log)
//! - Serve on a listener until shutdown is signalled

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::validation::{compile_routes, ValidationError};
use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::request::{RequestId, RequestIdLayer};
use crate::proxy::{AnthropicCompatibleAdapter, ProxyEngine, UpstreamClient};
use crate::routing::{ModelMatcher, RouteTable};

/// Span for one request; [`RequestIdLayer`] runs first so the ID is known.
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(ToString::to_string)
        .unwrap_or_default();
    tracing::debug_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid routes: {}", join(.0))]
    Routes(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let routes = compile_routes(&config.model_list).map_err(ServerError::Routes)?;
        for route in &routes {
            tracing::debug!(
                model = %route.model_name,
                upstream_model = %route.upstream_model,
                api_base = %route.api_base,
                auth_type = route.auth_mode.as_str(),
                "Route compiled"
            );
        }
        let table = RouteTable::new(routes, ModelMatcher::from_config(&config.routing));

        tracing::info!(
            models = ?table.model_names(),
            trim_model_lookup = config.routing.trim_model_lookup,
            "Routes loaded"
        );

        let client = UpstreamClient::new(&config.upstream);
        let engine = ProxyEngine::new(
            Arc::new(table),
            Arc::new(AnthropicCompatibleAdapter::new()),
            client,
            config.limits.max_body_bytes,
        );

        let state = AppState {
            engine: Arc::new(engine),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(handlers::healthz))
            .route("/anthropic/v1/messages", any(handlers::messages))
            .route("/anthropic/v1/messages/count_tokens", any(handlers::count_tokens))
            .route("/anthropic/v1/models", any(handlers::models))
            .route("/anthropic", any(handlers::unsupported))
            .route("/anthropic/", any(handlers::unsupported))
            .route("/anthropic/{*rest}", any(handlers::unsupported))
            .with_state(state)
            .layer(middleware::from_fn(crate::http::middleware::access_log))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(RequestIdLayer)
    }

    /// The fully layered router, e.g. for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Stops accepting when `shutdown` fires and returns once in-flight
    /// requests have drained.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
