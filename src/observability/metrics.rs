//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): time to response head
//! - `gateway_upstream_responses_total` (counter): upstream outcomes by model
//! - `gateway_upstream_duration_seconds` (histogram): upstream time to response head
//!
//! Recording is a no-op until a recorder is installed, so the request path
//! never checks whether metrics are enabled.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed client request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    ::metrics::counter!("gateway_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record how an upstream call ended.
pub fn record_upstream(model: &str, outcome: &'static str, start: Instant) {
    ::metrics::counter!("gateway_upstream_responses_total", "model" => model.to_string(), "outcome" => outcome)
        .increment(1);
    ::metrics::histogram!("gateway_upstream_duration_seconds", "model" => model.to_string())
        .record(start.elapsed().as_secs_f64());
}
