use std::collections::HashSet;

use serde_json::Value;

use wp_core::ast::{Pattern, PatternNode};
use wp_core::binding::{lookup_path, stringify_scalar, Bindings};
use wp_core::url::encode_component;

/// Reverse builder: argument values → canonical `path?query`.
///
/// The pattern tree is flattened once into pieces with literal text already
/// encoded, then interpreted per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builder {
    pieces: Vec<Piece>,
    /// Argument keys owned by params; everything else goes to the query.
    consumed: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Param {
        name: String,
        occurrence: usize,
        default: Option<String>,
    },
    Group(Vec<Piece>),
}

impl Builder {
    pub fn compile(pattern: &Pattern) -> Self {
        let mut consumed = HashSet::new();
        for param in pattern.params() {
            consumed.insert(param.name.clone());
            if let Some((head, _)) = param.name.split_once('.') {
                consumed.insert(head.to_string());
            }
        }

        Self {
            pieces: compile_node(&pattern.root),
            consumed,
        }
    }

    /// Render `args`. Never fails; unresolvable params render empty.
    pub fn build(&self, args: &Bindings) -> String {
        let mut out = String::new();
        render(&self.pieces, args, &mut out);
        self.append_query(args, &mut out);
        out
    }

    fn append_query(&self, args: &Bindings, out: &mut String) {
        let mut first = true;
        let mut push = |key: &str, value: String| {
            if value.is_empty() {
                return;
            }
            out.push(if first { '?' } else { '&' });
            first = false;
            out.push_str(&encode_component(key));
            out.push('=');
            out.push_str(&encode_component(&value));
        };

        for (key, value) in args {
            if self.consumed.contains(key) {
                continue;
            }
            match value {
                Value::Array(items) => {
                    for item in items {
                        push(key, stringify_scalar(item));
                    }
                }
                other => push(key, stringify_scalar(other)),
            }
        }
    }
}

fn compile_node(node: &PatternNode) -> Vec<Piece> {
    match node {
        PatternNode::Literal(text) => vec![Piece::Text(encode_component(text).into_owned())],
        PatternNode::Delimiter => vec![Piece::Text("/".to_string())],
        PatternNode::Param(param) => vec![Piece::Param {
            name: param.name.clone(),
            occurrence: param.occurrence,
            default: param.default.clone(),
        }],
        PatternNode::Sequence(children) => children.iter().flat_map(compile_node).collect(),
        PatternNode::Option(children) => {
            vec![Piece::Group(children.iter().flat_map(compile_node).collect())]
        }
    }
}

/// Render pieces into `out`. Returns true if a param directly in `pieces`
/// (not inside a nested group) resolved empty; the enclosing group then
/// renders nothing. A nested group swallows its own emptiness.
fn render(pieces: &[Piece], args: &Bindings, out: &mut String) -> bool {
    let mut missing = false;
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Param {
                name,
                occurrence,
                default,
            } => {
                let value = resolve(args, name, *occurrence)
                    .or_else(|| default.clone())
                    .unwrap_or_default();
                if value.is_empty() {
                    missing = true;
                } else {
                    out.push_str(&encode_component(&value));
                }
            }
            Piece::Group(children) => {
                let mut chunk = String::new();
                if !render(children, args, &mut chunk) {
                    out.push_str(&chunk);
                }
            }
        }
    }
    missing
}

/// The value for one param occurrence, `None` when absent or empty.
fn resolve(args: &Bindings, name: &str, occurrence: usize) -> Option<String> {
    let value = match lookup_path(args, name)? {
        Value::Array(items) => items.get(occurrence)?,
        scalar if occurrence == 0 => scalar,
        _ => return None,
    };
    Some(stringify_scalar(value)).filter(|s| !s.is_empty())
}
