//! Waypoint Router
//!
//! The consumer-facing side of Waypoint: compiled [`Rule`]s and an ordered
//! [`Router`] that dispatches `(verb, url)` pairs to them and builds URLs
//! back from arguments.
//!
//! # Modules
//!
//! - `rule`: a single compiled route with match and build
//! - `router`: ordered rule table, verb refcounts, reverse routing

pub mod router;
pub mod rule;

// Re-export commonly used types
pub use router::{Lookup, Matches, RouteMatch, Router};
pub use rule::{Rule, RuleData, RuleMatch};
pub use wp_core::{Bindings, CompileOptions, Error, KindRegistry, Result, Verbs};
