//! Request proxying subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → engine.rs (read body, extract `model`, resolve route, rewrite payload)
//!     → adapter.rs (upstream URL, credentials)
//!     → headers.rs (strip hop-by-hop / credential headers)
//!     → client.rs (dispatch with timeouts)
//!     → engine.rs (classify response)
//!         → buffered: errors.rs normalizes failures
//!         → streaming: relay.rs copies chunks as they arrive
//! ```
//!
//! # Design Decisions
//! - No mutable shared state on the request path
//! - No retries, no caching
//! - Stream contents are never parsed

pub mod adapter;
pub mod client;
pub mod engine;
pub mod errors;
pub mod headers;
pub mod models;
pub mod relay;

pub use adapter::{AnthropicCompatibleAdapter, UpstreamAdapter};
pub use client::UpstreamClient;
pub use engine::ProxyEngine;
