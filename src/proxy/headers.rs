//! Header filtering across the proxy boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip client credentials on the way upstream
//! - Strip `content-length` on the way back to the client
//!
//! # Design Decisions
//! - Pure copy: the source map is never modified
//! - Order and multiplicity of surviving values are preserved
//! - The protocol adapter is the only writer of upstream credentials

use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::http::{HeaderMap, HeaderName};

/// Credential header used by api-key auth.
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Which way headers are crossing the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client request headers going to the upstream.
    ToUpstream,
    /// Upstream response headers going to the client.
    ToClient,
}

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn is_dropped(name: &HeaderName, direction: Direction) -> bool {
    if is_hop_by_hop(name) {
        return true;
    }
    match direction {
        Direction::ToUpstream => name == AUTHORIZATION || name == X_API_KEY,
        Direction::ToClient => name == CONTENT_LENGTH,
    }
}

/// Copy `src`, leaving out headers that must not cross in `direction`.
pub fn filter_headers(src: &HeaderMap, direction: Direction) -> HeaderMap {
    let mut dst = HeaderMap::with_capacity(src.len());
    for (name, value) in src {
        if is_dropped(name, direction) {
            continue;
        }
        dst.append(name.clone(), value.clone());
    }
    dst
}
