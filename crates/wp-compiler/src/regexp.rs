//! Pattern tree → matching regex.
//!
//! Every param occurrence becomes exactly one capturing group, in document
//! order. Kind fragments are guaranteed group-free, so group `n` always
//! belongs to the `n`th param.

use regex::Regex;

use wp_core::ast::{Constraint, Param, Pattern, PatternNode};
use wp_core::error::{Error, Result};
use wp_core::kind::KindRegistry;
use wp_core::types::CompileOptions;
use wp_core::url::encode_char;

/// Value class for params without a constraint.
const DEFAULT_CLASS: &str = "[^/]+?";

/// A compiled matching regex plus the param name behind each group.
#[derive(Debug, Clone)]
pub struct PathRegex {
    regex: Regex,
    /// Group `i + 1` captures `groups[i]`.
    groups: Vec<String>,
}

impl PathRegex {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}

/// Compile the path part of a pattern.
pub fn compile_regex(
    pattern: &Pattern,
    kinds: &KindRegistry,
    options: &CompileOptions,
) -> Result<PathRegex> {
    let source = regex_source(&pattern.root, kinds, options)?;
    log::trace!("pattern {:?} compiled to {}", pattern.source, source);

    let regex = Regex::new(&source).map_err(|e| Error::InvalidRegex {
        pattern: pattern.source.clone(),
        reason: e.to_string(),
    })?;

    let groups: Vec<String> = pattern.params().into_iter().map(|p| p.name.clone()).collect();
    if regex.captures_len() != groups.len() + 1 {
        return Err(Error::InvalidRegex {
            pattern: pattern.source.clone(),
            reason: format!(
                "expected {} capture groups, found {}",
                groups.len(),
                regex.captures_len() - 1
            ),
        });
    }

    Ok(PathRegex { regex, groups })
}

/// The full regex source for a pattern root, flags and anchors included.
pub fn regex_source(
    root: &PatternNode,
    kinds: &KindRegistry,
    options: &CompileOptions,
) -> Result<String> {
    let mut source = String::new();
    if options.ignore_case {
        source.push_str("(?i)");
    }
    if options.anchor_start {
        source.push('^');
    }
    emit_node(&mut source, root, kinds, options)?;
    if options.anchor_end {
        source.push('$');
    }
    Ok(source)
}

fn emit_node(
    out: &mut String,
    node: &PatternNode,
    kinds: &KindRegistry,
    options: &CompileOptions,
) -> Result<()> {
    match node {
        PatternNode::Literal(text) => emit_literal(out, text, options.ignore_case),
        PatternNode::Delimiter => out.push('/'),
        PatternNode::Param(param) => {
            out.push('(');
            emit_param_body(out, param, kinds, options)?;
            out.push(')');
        }
        PatternNode::Sequence(children) => {
            for child in children {
                emit_node(out, child, kinds, options)?;
            }
        }
        PatternNode::Option(children) => {
            out.push_str("(?:");
            for child in children {
                emit_node(out, child, kinds, options)?;
            }
            out.push_str(")?");
        }
    }
    Ok(())
}

fn emit_param_body(
    out: &mut String,
    param: &Param,
    kinds: &KindRegistry,
    options: &CompileOptions,
) -> Result<()> {
    if !param.choices.is_empty() {
        emit_choices(out, &param.choices, options.ignore_case);
        return Ok(());
    }
    match &param.constraint {
        Constraint::Any => out.push_str(DEFAULT_CLASS),
        Constraint::Kind(name) => out.push_str(kinds.resolve(name)?.fragment()),
        Constraint::Regex(regex) => out.push_str(regex),
    }
    Ok(())
}

/// `(?:a|b|c)` with each choice compiled as a literal.
pub fn emit_choices(out: &mut String, choices: &[String], ignore_case: bool) {
    out.push_str("(?:");
    for (i, choice) in choices.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        emit_literal(out, choice, ignore_case);
    }
    out.push(')');
}

/// Literal text. A char whose encoded form differs from itself matches
/// either spelling; under `ignore_case` the lower-case hex spelling is
/// accepted too.
pub fn emit_literal(out: &mut String, text: &str, ignore_case: bool) {
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let plain: &str = c.encode_utf8(&mut buf);
        let raw = regex::escape(plain);
        let encoded = encode_char(c);
        if encoded == plain {
            out.push_str(&raw);
            continue;
        }

        out.push_str("(?:");
        out.push_str(&raw);
        out.push('|');
        out.push_str(&encoded);
        let lower = encoded.to_ascii_lowercase();
        if ignore_case && lower != encoded {
            out.push('|');
            out.push_str(&lower);
        }
        out.push(')');
    }
}
