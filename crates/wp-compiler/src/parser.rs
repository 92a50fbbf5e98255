//! Pattern DSL parser
//!
//! ```text
//! /post/<Int:id>/(<{[a-z-]+}:slug=latest>/)?page&tag+=news,blog
//! ```
//!
//! - `/` delimiter, `\` escapes the next char, anything else is literal text
//! - `<name>`, `<name=default>`, `<Kind:name>`, `<{regex}:name>`,
//!   `<name=a,b,c>` (literal choices, first is the default)
//! - `(...)` optional group, nestable, never empty
//! - the first unescaped `?` or `&` starts the query rules: `?name` optional,
//!   `&name` required, `name+` repeatable, same `Kind:`/`{regex}:`/`=` forms

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::CharIndices;

use wp_core::ast::{Constraint, Param, Pattern, PatternNode, QueryArgRule};
use wp_core::error::{Error, Result};

const PARAM_NAME_STOPS: &[char] = &[':', '=', '>', ','];
const PARAM_VALUE_STOPS: &[char] = &[',', '>', '=', ':'];
const QUERY_NAME_STOPS: &[char] = &['?', '&', ':', '=', '+', ',', '>'];
const QUERY_VALUE_STOPS: &[char] = &['?', '&', ',', '=', '>'];

/// Parse a pattern string into its tree and query rules.
pub fn parse_pattern(source: &str) -> Result<Pattern> {
    let pattern = Parser::new(source).parse()?;
    log::trace!("parsed pattern {:?}: {:?}", source, pattern.root);
    Ok(pattern)
}

struct Parser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    literal: String,
    /// Open groups; index 0 is the root sequence.
    stack: Vec<Vec<PatternNode>>,
    /// Source offsets of the open `(` for each non-root stack entry.
    opens: Vec<usize>,
    occurrences: HashMap<String, usize>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            literal: String::new(),
            stack: vec![Vec::new()],
            opens: Vec::new(),
            occurrences: HashMap::new(),
        }
    }

    fn error(&self, message: &'static str, offset: usize) -> Error {
        Error::syntax(message, self.source, offset)
    }

    fn parse(mut self) -> Result<Pattern> {
        let mut query = Vec::new();

        while let Some((offset, ch)) = self.chars.next() {
            match ch {
                '\\' => {
                    let escaped = self.escaped(offset)?;
                    self.literal.push(escaped);
                }
                '/' => {
                    self.flush_literal();
                    self.push(PatternNode::Delimiter);
                }
                '(' => {
                    self.flush_literal();
                    self.stack.push(Vec::new());
                    self.opens.push(offset);
                }
                ')' => {
                    self.flush_literal();
                    self.close_group(offset)?;
                }
                '<' => {
                    self.flush_literal();
                    let param = self.param(offset)?;
                    self.push(PatternNode::Param(param));
                }
                '>' | '=' | ',' => return Err(self.error("Unexpected character", offset)),
                '?' | '&' => {
                    if let Some(&open) = self.opens.last() {
                        return Err(self.error("Unbalanced group", open));
                    }
                    self.flush_literal();
                    query = self.query_rules(ch)?;
                    break;
                }
                _ => self.literal.push(ch),
            }
        }

        if let Some(&open) = self.opens.last() {
            return Err(self.error("Unbalanced group", open));
        }
        self.flush_literal();

        let root = self.stack.pop().unwrap_or_default();
        Ok(Pattern {
            source: self.source.to_string(),
            root: PatternNode::Sequence(root),
            query,
        })
    }

    fn push(&mut self, node: PatternNode) {
        if let Some(top) = self.stack.last_mut() {
            top.push(node);
        }
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            self.push(PatternNode::Literal(text));
        }
    }

    fn close_group(&mut self, offset: usize) -> Result<()> {
        if self.opens.pop().is_none() {
            return Err(self.error("Unbalanced group", offset));
        }
        let children = self.stack.pop().unwrap_or_default();
        if children.is_empty() {
            return Err(self.error("Empty group", offset));
        }
        self.push(PatternNode::Option(children));
        Ok(())
    }

    /// The char after a `\` at `offset`.
    fn escaped(&mut self, offset: usize) -> Result<char> {
        match self.chars.next() {
            Some((_, ch)) => Ok(ch),
            None => Err(self.error("Unterminated escape", offset)),
        }
    }

    /// Read text up to (and consuming) one of `stops`. Returns the text and
    /// the terminator, `None` at end of input.
    fn token(&mut self, stops: &[char]) -> Result<(String, Option<(usize, char)>)> {
        let mut text = String::new();
        while let Some((offset, ch)) = self.chars.next() {
            match ch {
                '\\' => text.push(self.escaped(offset)?),
                '<' => return Err(self.error("Unexpected character", offset)),
                _ if stops.contains(&ch) => return Ok((text, Some((offset, ch)))),
                _ => text.push(ch),
            }
        }
        Ok((text, None))
    }

    /// Read a `{regex}` body after its opening brace. Backslash pairs are
    /// kept verbatim; nested braces must balance.
    fn braced_regex(&mut self, open: usize) -> Result<String> {
        let mut regex = String::new();
        let mut depth = 1usize;
        while let Some((offset, ch)) = self.chars.next() {
            match ch {
                '\\' => {
                    regex.push('\\');
                    regex.push(self.escaped(offset)?);
                }
                '{' => {
                    depth += 1;
                    regex.push(ch);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        if regex.is_empty() {
                            return Err(self.error("Empty regex", open));
                        }
                        return Ok(regex);
                    }
                    regex.push(ch);
                }
                _ => regex.push(ch),
            }
        }
        Err(self.error("Unterminated regex", open))
    }

    /// An optional `{regex}:` prefix.
    fn regex_prefix(&mut self) -> Result<Option<String>> {
        let Some(&(open, '{')) = self.chars.peek() else {
            return Ok(None);
        };
        self.chars.next();
        let regex = self.braced_regex(open)?;
        match self.chars.next() {
            Some((_, ':')) => Ok(Some(regex)),
            Some((offset, _)) => Err(self.error("Expected ':' after regex", offset)),
            None => Err(self.error("Unterminated param", open)),
        }
    }

    /// `name` or `Kind:name` (the regex prefix, if any, is already read).
    /// Returns the constraint, the name and the char that ended the name.
    fn constrained_name(
        &mut self,
        regex: Option<String>,
        stops: &[char],
        start: usize,
    ) -> Result<(Constraint, String, Option<(usize, char)>)> {
        let (head, term) = self.token(stops)?;
        let (constraint, name, term) = match (regex, term) {
            (Some(_), Some((offset, ':'))) => {
                return Err(self.error("Unexpected character", offset));
            }
            (Some(regex), term) => (Constraint::Regex(regex), head, term),
            (None, Some((offset, ':'))) => {
                if head.is_empty() {
                    return Err(self.error("Empty kind", offset));
                }
                let (name, term) = self.token(stops)?;
                if let Some((offset, ':')) = term {
                    return Err(self.error("Unexpected character", offset));
                }
                (Constraint::Kind(head), name, term)
            }
            (None, term) => (Constraint::Any, head, term),
        };

        if name.is_empty() {
            let offset = term.map(|(offset, _)| offset).unwrap_or(start);
            return Err(self.error("Empty name", offset));
        }
        Ok((constraint, name, term))
    }

    /// Comma-separated values after `=`, up to one of `ends` (or the end of
    /// input when `eof_ends` is set).
    fn values(
        &mut self,
        stops: &[char],
        ends: &[char],
        eof_ends: bool,
        start: usize,
    ) -> Result<(Vec<String>, Option<(usize, char)>)> {
        let mut values = Vec::new();
        loop {
            let (value, term) = self.token(stops)?;
            values.push(value);
            match term {
                Some((_, ',')) => continue,
                Some((_, ch)) if ends.contains(&ch) => return Ok((values, term)),
                None if eof_ends => return Ok((values, None)),
                None => return Err(self.error("Unterminated param", start)),
                Some((offset, _)) => return Err(self.error("Unexpected character", offset)),
            }
        }
    }

    /// Split `=` values into a default and literal choices.
    fn defaults(&self, values: Vec<String>, start: usize) -> Result<(Option<String>, Vec<String>)> {
        if values.len() < 2 {
            let default = values.into_iter().next().filter(|v| !v.is_empty());
            return Ok((default, Vec::new()));
        }
        if values.iter().any(String::is_empty) {
            return Err(self.error("Empty choice", start));
        }
        Ok((values.first().cloned(), values))
    }

    /// A path param after its `<` at `open`.
    fn param(&mut self, open: usize) -> Result<Param> {
        let regex = self.regex_prefix()?;
        let (constraint, name, term) = self.constrained_name(regex, PARAM_NAME_STOPS, open)?;

        let (default, choices) = match term {
            Some((_, '>')) => (None, Vec::new()),
            Some((offset, '=')) => {
                let (values, _) = self.values(PARAM_VALUE_STOPS, &['>'], false, open)?;
                self.defaults(values, offset)?
            }
            Some((offset, _)) => return Err(self.error("Unexpected character", offset)),
            None => return Err(self.error("Unterminated param", open)),
        };

        let count = self.occurrences.entry(name.clone()).or_insert(0);
        let occurrence = *count;
        *count += 1;

        Ok(Param {
            name,
            constraint,
            default,
            choices,
            occurrence,
        })
    }

    /// The query section, starting after the first `?`/`&` marker.
    fn query_rules(&mut self, first: char) -> Result<Vec<QueryArgRule>> {
        let mut rules = Vec::new();
        let mut marker = first;

        loop {
            let start = self.chars.peek().map(|&(offset, _)| offset).unwrap_or(self.source.len());
            let regex = self.regex_prefix()?;
            let (constraint, name, mut term) =
                self.constrained_name(regex, QUERY_NAME_STOPS, start)?;

            let mut rule = QueryArgRule::new(name);
            rule.constraint = constraint;
            rule.required = marker == '&';

            if let Some((_, '+')) = term {
                rule.multiple = true;
                term = self.chars.next();
            }

            if let Some((offset, '=')) = term {
                let (values, end) = self.values(QUERY_VALUE_STOPS, &['?', '&'], true, offset)?;
                let (default, choices) = self.defaults(values, offset)?;
                rule.default = default;
                rule.choices = choices;
                term = end;
            }

            rules.push(rule);

            match term {
                Some((_, ch @ ('?' | '&'))) => marker = ch,
                None => break,
                Some((offset, _)) => return Err(self.error("Unexpected character", offset)),
            }
        }

        Ok(rules)
    }
}
