//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request body `model` field
//!     → matcher.rs (normalize requested name)
//!     → router.rs (route lookup)
//!     → Return: matched Route or None
//!
//! Route Compilation (at startup):
//!     ModelRouteConfig[]
//!     → config::validation::compile_routes (trim, check, parse auth mode)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Changing routes requires a restart

pub mod matcher;
pub mod router;

pub use matcher::ModelMatcher;
pub use router::{AuthMode, Route, RouteTable};
