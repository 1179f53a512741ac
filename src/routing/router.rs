//! Route lookup.
//!
//! # Responsibilities
//! - Store the compiled model routes
//! - Look up the route for a requested model name
//! - Enumerate configured model names for the model list
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup via HashMap
//! - Explicit `None` rather than a silent default route

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::routing::matcher::ModelMatcher;

/// Which credential header a route populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    ApiKey,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Bearer => "bearer",
            AuthMode::ApiKey => "x-api-key",
        }
    }
}

impl FromStr for AuthMode {
    type Err = ();

    /// Accepts the config spellings, case-insensitively. Empty means `x-api-key`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "x-api-key" => Ok(AuthMode::ApiKey),
            "bearer" => Ok(AuthMode::Bearer),
            _ => Err(()),
        }
    }
}

/// A compiled route: logical model name → upstream.
#[derive(Clone, PartialEq, Eq)]
pub struct Route {
    /// Name clients use (trimmed).
    pub model_name: String,
    /// Model identifier sent upstream.
    pub upstream_model: String,
    /// Upstream base URL.
    pub api_base: String,
    /// Upstream credential.
    pub api_key: String,
    pub auth_mode: AuthMode,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("model_name", &self.model_name)
            .field("upstream_model", &self.upstream_model)
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .finish()
    }
}

/// Immutable table of model routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
    names: Vec<String>,
    matcher: ModelMatcher,
}

impl RouteTable {
    /// Build a table from compiled routes.
    ///
    /// Routes come from `config::validation::compile_routes`, which already
    /// guarantees unique, trimmed, non-empty names.
    pub fn new(routes: Vec<Route>, matcher: ModelMatcher) -> Self {
        let mut names: Vec<String> = routes.iter().map(|r| r.model_name.clone()).collect();
        names.sort();

        let routes = routes
            .into_iter()
            .map(|r| (r.model_name.clone(), r))
            .collect();

        Self {
            routes,
            names,
            matcher,
        }
    }

    /// Look up the route for a requested model name.
    pub fn route_by_model(&self, requested: &str) -> Option<&Route> {
        self.routes.get(self.matcher.key(requested))
    }

    /// All configured model names, sorted.
    pub fn model_names(&self) -> &[String] {
        &self.names
    }
}
