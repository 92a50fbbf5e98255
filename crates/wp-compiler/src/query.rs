//! Query rules → typed slots for the backtracking matcher.

use regex::Regex;

use wp_core::ast::{Constraint, QueryArgRule};
use wp_core::backtrack::QuerySlot;
use wp_core::error::{Error, Result};
use wp_core::kind::KindRegistry;

/// A declared query argument with its value check compiled.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    rule: QueryArgRule,
    /// `None` accepts any value.
    check: Option<Regex>,
}

impl QueryMatcher {
    pub fn compile(rule: &QueryArgRule, kinds: &KindRegistry, ignore_case: bool) -> Result<Self> {
        let flags = if ignore_case { "(?i)" } else { "" };
        let body = if !rule.choices.is_empty() {
            let choices: Vec<String> = rule.choices.iter().map(|c| regex::escape(c)).collect();
            Some(choices.join("|"))
        } else {
            match &rule.constraint {
                Constraint::Any => None,
                Constraint::Kind(name) => Some(kinds.resolve(name)?.fragment().to_string()),
                Constraint::Regex(regex) => Some(regex.clone()),
            }
        };

        let check = match body {
            Some(body) => {
                let source = format!("{flags}^(?:{body})$");
                Some(Regex::new(&source).map_err(|e| Error::InvalidRegex {
                    pattern: source.clone(),
                    reason: e.to_string(),
                })?)
            }
            None => None,
        };

        Ok(Self {
            rule: rule.clone(),
            check,
        })
    }

    pub fn rule(&self) -> &QueryArgRule {
        &self.rule
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }
}

impl QuerySlot for QueryMatcher {
    fn required(&self) -> bool {
        self.rule.required
    }

    fn multiple(&self) -> bool {
        self.rule.multiple
    }

    fn accepts(&self, value: &str) -> bool {
        self.check.as_ref().map_or(true, |re| re.is_match(value))
    }
}
