//! Kinds: named regex fragments that constrain parameter values.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Error, Result};

/// Returns true if `fragment` is a valid regex with no capturing group.
///
/// Capturing groups inside a kind would shift the capture numbering of the
/// compiled pattern, so they are rejected; `(?:...)` and escaped parens are
/// fine.
pub fn check_regexp(fragment: &str) -> bool {
    match Regex::new(&format!("(?:{fragment})")) {
        Ok(re) => re.captures_len() == 1,
        Err(_) => false,
    }
}

/// A named value constraint.
#[derive(Debug, Clone)]
pub struct Kind {
    name: String,
    fragment: String,
    /// Whole-value matcher used for query tokens.
    exact: Regex,
}

impl Kind {
    /// Validate and build a kind.
    pub fn new(name: impl Into<String>, fragment: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let fragment = fragment.into();

        if name.is_empty() || !check_regexp(&fragment) {
            return Err(Error::InvalidKind { name, fragment });
        }

        let exact = Regex::new(&format!("^(?:{fragment})$")).map_err(|_| Error::InvalidKind {
            name: name.clone(),
            fragment: fragment.clone(),
        })?;

        Ok(Self {
            name,
            fragment,
            exact,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw regex fragment, spliced into compiled patterns as-is.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Whether a whole decoded value satisfies this kind.
    pub fn accepts(&self, value: &str) -> bool {
        self.exact.is_match(value)
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fragment == other.fragment
    }
}

impl Eq for Kind {}

/// Name-indexed set of kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindRegistry {
    kinds: HashMap<String, Kind>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a kind. Returns the previous definition.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Result<Option<Kind>> {
        let kind = Kind::new(name, fragment)?;
        log::debug!("registered kind {} = {}", kind.name, kind.fragment);
        Ok(self.kinds.insert(kind.name.clone(), kind))
    }

    pub fn get(&self, name: &str) -> Option<&Kind> {
        self.kinds.get(name)
    }

    /// Look up a kind, failing with `UnknownKind`.
    pub fn resolve(&self, name: &str) -> Result<&Kind> {
        self.get(name)
            .ok_or_else(|| Error::UnknownKind(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
