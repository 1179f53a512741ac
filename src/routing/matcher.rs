//! Model name matching.
//!
//! # Responsibilities
//! - Turn the `model` value a client sent into a route table key
//!
//! # Design Decisions
//! - Matching is case-sensitive
//! - Configured names are trimmed when the table is built
//! - Whether the requested name is trimmed is a configuration choice

use crate::config::schema::RoutingConfig;

/// How a requested model name is matched against configured names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelMatcher {
    /// The requested name must equal a configured name byte for byte.
    #[default]
    Exact,
    /// Leading/trailing whitespace is removed from the requested name first.
    Trimmed,
}

impl ModelMatcher {
    pub fn from_config(config: &RoutingConfig) -> Self {
        if config.trim_model_lookup {
            Self::Trimmed
        } else {
            Self::Exact
        }
    }

    /// Returns the key to look up for a requested model name.
    pub fn key<'a>(&self, requested: &'a str) -> &'a str {
        match self {
            Self::Exact => requested,
            Self::Trimmed => requested.trim(),
        }
    }
}
