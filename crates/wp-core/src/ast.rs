//! Pattern syntax tree.
//!
//! Produced by the parser in `wp-compiler`, consumed by the regex and
//! builder compilers. Nodes are immutable once parsed.

/// How a param or query rule constrains its value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Constraint {
    /// No constraint beyond the default class.
    #[default]
    Any,
    /// A registered kind (`<Kind:name>`).
    Kind(String),
    /// An inline regex (`<{regex}:name>`).
    Regex(String),
}

/// A named path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub constraint: Constraint,
    pub default: Option<String>,
    /// Literal alternatives from `<name=a,b,c>`; empty unless two or more.
    pub choices: Vec<String>,
    /// Position of this occurrence among params sharing the same name.
    pub occurrence: usize,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: Constraint::Any,
            default: None,
            choices: Vec::new(),
            occurrence: 0,
        }
    }

    /// The kind name, if any.
    pub fn kind(&self) -> Option<&str> {
        match &self.constraint {
            Constraint::Kind(kind) => Some(kind),
            _ => None,
        }
    }

    /// The inline regex, if any.
    pub fn regex_override(&self) -> Option<&str> {
        match &self.constraint {
            Constraint::Regex(re) => Some(re),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    Literal(String),
    Delimiter,
    Param(Param),
    Sequence(Vec<PatternNode>),
    Option(Vec<PatternNode>),
}

impl PatternNode {
    /// Visit every param in document order.
    pub fn walk_params<'a>(&'a self, visit: &mut impl FnMut(&'a Param)) {
        match self {
            PatternNode::Param(param) => visit(param),
            PatternNode::Sequence(children) | PatternNode::Option(children) => {
                for child in children {
                    child.walk_params(visit);
                }
            }
            PatternNode::Literal(_) | PatternNode::Delimiter => {}
        }
    }
}

/// A declared query argument (`?name`, `&name+`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryArgRule {
    pub name: String,
    pub constraint: Constraint,
    pub required: bool,
    pub multiple: bool,
    pub default: Option<String>,
    pub choices: Vec<String>,
}

impl QueryArgRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: Constraint::Any,
            required: false,
            multiple: false,
            default: None,
            choices: Vec::new(),
        }
    }
}

/// A parsed pattern: the path tree plus its ordered query rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    /// Always a `PatternNode::Sequence`.
    pub root: PatternNode,
    pub query: Vec<QueryArgRule>,
}

impl Pattern {
    /// All params in document order.
    pub fn params(&self) -> Vec<&Param> {
        let mut params = Vec::new();
        self.root.walk_params(&mut |param| params.push(param));
        params
    }

    /// Distinct param names in first-seen order.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for param in self.params() {
            if !names.contains(&param.name.as_str()) {
                names.push(&param.name);
            }
        }
        names
    }

    /// Number of params named `name`.
    pub fn occurrences(&self, name: &str) -> usize {
        self.params().iter().filter(|p| p.name == name).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, occurrence: usize) -> PatternNode {
        PatternNode::Param(Param {
            occurrence,
            ..Param::new(name)
        })
    }

    #[test]
    fn test_params_in_document_order() {
        let pattern = Pattern {
            source: "/<a>/(<b>/(<a>))".into(),
            root: PatternNode::Sequence(vec![
                PatternNode::Delimiter,
                param("a", 0),
                PatternNode::Delimiter,
                PatternNode::Option(vec![
                    param("b", 0),
                    PatternNode::Delimiter,
                    PatternNode::Option(vec![param("a", 1)]),
                ]),
            ]),
            query: Vec::new(),
        };

        let names: Vec<_> = pattern.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert_eq!(pattern.param_names(), vec!["a", "b"]);
        assert_eq!(pattern.occurrences("a"), 2);
    }

    #[test]
    fn test_constraint_accessors() {
        let mut p = Param::new("id");
        assert_eq!(p.kind(), None);
        p.constraint = Constraint::Kind("Int".into());
        assert_eq!(p.kind(), Some("Int"));
        p.constraint = Constraint::Regex("\\d+".into());
        assert_eq!(p.regex_override(), Some("\\d+"));
    }
}
