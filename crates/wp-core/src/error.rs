//! Error type shared by every Waypoint crate.

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while registering kinds or compiling patterns.
///
/// Matching and building never produce errors; they degrade to "no match"
/// or to an empty rendering instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed pattern text.
    #[error("Syntax error: {message} at offset {offset} in {pattern:?}")]
    Syntax {
        message: &'static str,
        pattern: String,
        offset: usize,
    },
    /// A param or query rule references a kind that was never registered.
    #[error("Unknown kind: {0}")]
    UnknownKind(String),
    /// A kind fragment is not a valid regex or contains a capturing group.
    #[error("Invalid kind {name}: {fragment:?}")]
    InvalidKind { name: String, fragment: String },
    /// The generated source was rejected by the regex engine.
    #[error("Invalid regex {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

impl Error {
    /// Builds a syntax error pointing at `offset` in `pattern`.
    pub fn syntax(message: &'static str, pattern: &str, offset: usize) -> Self {
        Self::Syntax {
            message,
            pattern: pattern.to_string(),
            offset,
        }
    }

    /// Whether this is a pattern syntax error rather than a type error.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    /// The offending source for syntax errors.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Syntax { pattern, .. } | Self::InvalidRegex { pattern, .. } => Some(pattern),
            _ => None,
        }
    }
}
