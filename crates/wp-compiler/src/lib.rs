//! Waypoint Route Pattern Compiler
//!
//! This crate turns pattern strings into a matching regex, a reverse
//! builder and typed query slots.

pub mod builder;
pub mod parser;
pub mod query;
pub mod regexp;

pub use builder::Builder;
pub use parser::parse_pattern;
pub use query::QueryMatcher;
pub use regexp::{compile_regex, PathRegex};

use wp_core::ast::Pattern;
use wp_core::error::Result;
use wp_core::kind::KindRegistry;
use wp_core::types::CompileOptions;

/// Everything derived from a pattern and a kind set. Never mutated; a kind
/// change produces a fresh one.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub path: PathRegex,
    pub builder: Builder,
    pub query: Vec<QueryMatcher>,
}

impl CompiledPattern {
    pub fn compile(
        pattern: &Pattern,
        kinds: &KindRegistry,
        options: &CompileOptions,
    ) -> Result<Self> {
        let path = compile_regex(pattern, kinds, options)?;
        let query = pattern
            .query
            .iter()
            .map(|rule| QueryMatcher::compile(rule, kinds, options.ignore_case))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path,
            builder: Builder::compile(pattern),
            query,
        })
    }
}

/// Parse and compile in one step.
pub fn compile(
    source: &str,
    kinds: &KindRegistry,
    options: &CompileOptions,
) -> Result<(Pattern, CompiledPattern)> {
    let pattern = parse_pattern(source)?;
    let compiled = CompiledPattern::compile(&pattern, kinds, options)?;
    Ok((pattern, compiled))
}
