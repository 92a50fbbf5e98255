//! Core type definitions for Waypoint
//!
//! These types are shared by the compiler and the router.

use serde::{Deserialize, Serialize};

// =============================================================================
// HTTP Verbs (bit mask for method filtering)
// =============================================================================

bitflags::bitflags! {
    /// HTTP method bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Verbs: u16 {
        const GET = 1 << 0;
        const HEAD = 1 << 1;
        const POST = 1 << 2;
        const PUT = 1 << 3;
        const PATCH = 1 << 4;
        const DELETE = 1 << 5;
        const OPTIONS = 1 << 6;
        const TRACE = 1 << 7;
        const CONNECT = 1 << 8;
    }
}

/// Number of distinct verbs, i.e. the size of a refcount table.
pub const VERB_COUNT: usize = 9;

impl Verbs {
    /// Parse a single method name. Method names are matched without regard
    /// to ASCII case.
    pub fn from_method(method: &str) -> Option<Self> {
        Self::all()
            .iter_names()
            .find(|(name, _)| name.eq_ignore_ascii_case(method))
            .map(|(_, verb)| verb)
    }

    /// Parse a list of method names, failing on the first unknown one.
    pub fn from_methods<'a, I>(methods: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        methods
            .into_iter()
            .try_fold(Self::empty(), |acc, m| Self::from_method(m).map(|v| acc | v))
    }

    /// GET implies HEAD.
    pub fn normalized(self) -> Self {
        if self.contains(Self::GET) {
            self | Self::HEAD
        } else {
            self
        }
    }

    /// Upper-case method names, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }

    /// Index of a single-bit verb into a refcount table.
    pub fn slot(self) -> Option<usize> {
        if self.bits().count_ones() == 1 {
            Some(self.bits().trailing_zeros() as usize)
        } else {
            None
        }
    }
}

impl Default for Verbs {
    fn default() -> Self {
        Self::GET
    }
}

// =============================================================================
// Compile Options
// =============================================================================

/// Options controlling how a pattern is turned into a matching regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Case-insensitive matching (`i` flag)
    pub ignore_case: bool,
    /// Prefix the regex with `^`
    pub anchor_start: bool,
    /// Suffix the regex with `$`
    pub anchor_end: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            anchor_start: true,
            anchor_end: true,
        }
    }
}

impl CompileOptions {
    pub fn ignore_case(mut self, value: bool) -> Self {
        self.ignore_case = value;
        self
    }

    pub fn anchor_start(mut self, value: bool) -> Self {
        self.anchor_start = value;
        self
    }

    pub fn anchor_end(mut self, value: bool) -> Self {
        self.anchor_end = value;
        self
    }
}
