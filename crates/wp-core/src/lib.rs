//! Waypoint Core Library
//!
//! Shared building blocks for the Waypoint route-pattern compiler and
//! matcher. Nothing here performs I/O; everything classifies or transforms
//! strings.
//!
//! # Modules
//!
//! - `ast`: parsed pattern tree and query rules
//! - `backtrack`: assignment of repeated query values to ordered query rules
//! - `binding`: match bindings, dotted-name nesting and the untyped query codec
//! - `error`: the workspace error type
//! - `kind`: named regex fragments constraining param values
//! - `types`: HTTP verbs and compile options
//! - `url`: URL splitting and percent-encoding

pub mod ast;
pub mod backtrack;
pub mod binding;
pub mod error;
pub mod kind;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use ast::{Constraint, Param, Pattern, PatternNode, QueryArgRule};
pub use binding::Bindings;
pub use error::{Error, Result};
pub use kind::{check_regexp, Kind, KindRegistry};
pub use types::{CompileOptions, Verbs, VERB_COUNT};
