//! Ordered rule table with verb bookkeeping.
//!
//! Rules are tried in registration order. Alongside the rules the router
//! keeps a per-verb count of how many rules accept each method, so a request
//! for a method nobody handles is answered without scanning.

use std::collections::HashMap;
use std::sync::Arc;

use wp_core::binding::Bindings;
use wp_core::error::Result;
use wp_core::kind::KindRegistry;
use wp_core::types::{Verbs, VERB_COUNT};

use crate::rule::{Rule, RuleData, RuleMatch};

// =============================================================================
// Lookup Results
// =============================================================================

/// A rule that matched both path and verb.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub rule: &'a Rule<T>,
    pub bindings: RuleMatch,
}

impl<'a, T> RouteMatch<'a, T> {
    pub fn name(&self) -> &'a str {
        self.rule.name()
    }

    pub fn payload(&self) -> &'a T {
        self.rule.payload()
    }
}

/// Outcome of [`Router::find`].
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Found(RouteMatch<'a, T>),
    /// The path matched at least one rule but none accepts the verb. Carries
    /// the union of verbs those rules accept; empty when the verb is handled
    /// by no rule at all.
    MethodNotAllowed(Verbs),
    NotFound,
}

impl<'a, T> Lookup<'a, T> {
    pub fn found(self) -> Option<RouteMatch<'a, T>> {
        match self {
            Lookup::Found(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

// =============================================================================
// Router
// =============================================================================

#[derive(Debug)]
pub struct Router<T> {
    rules: Vec<Arc<Rule<T>>>,
    index: HashMap<String, usize>,
    verb_counts: [usize; VERB_COUNT],
    kinds: KindRegistry,
    next_id: u64,
}

impl<T> Clone for Router<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            index: self.index.clone(),
            verb_counts: self.verb_counts,
            kinds: self.kinds.clone(),
            next_id: self.next_id,
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::with_kinds(KindRegistry::new())
    }

    pub fn with_kinds(kinds: KindRegistry) -> Self {
        Self {
            rules: Vec::new(),
            index: HashMap::new(),
            verb_counts: [0; VERB_COUNT],
            kinds,
            next_id: 0,
        }
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Register (or redefine) a kind and recompile every rule against the
    /// new set. On error nothing changes.
    pub fn register_kind(&mut self, name: &str, fragment: &str) -> Result<()> {
        let mut kinds = self.kinds.clone();
        kinds.register(name, fragment)?;

        let rules = self
            .rules
            .iter()
            .map(|rule| rule.recompile(&kinds).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("kind {} registered, recompiled {} rules", name, rules.len());
        self.kinds = kinds;
        self.rules = rules;
        Ok(())
    }

    /// Compile and register a rule.
    ///
    /// A rule whose name is already registered replaces the old one at the
    /// same position.
    pub fn add_rule(&mut self, source: &str, mut data: RuleData<T>) -> Result<&Rule<T>> {
        if data.name.is_none() {
            data.name = Some(self.next_name());
        }
        let rule = Rule::new(source, data, &self.kinds)?;

        let mut counts = self.verb_counts;
        adjust_counts(&mut counts, rule.verbs(), true);

        let slot = match self.index.get(rule.name()) {
            Some(&slot) => {
                adjust_counts(&mut counts, self.rules[slot].verbs(), false);
                log::debug!("replacing rule {} with {}", rule.name(), source);
                self.rules[slot] = Arc::new(rule);
                slot
            }
            None => {
                log::debug!("adding rule {} for {}", rule.name(), source);
                self.index.insert(rule.name().to_string(), self.rules.len());
                self.rules.push(Arc::new(rule));
                self.rules.len() - 1
            }
        };
        self.verb_counts = counts;

        Ok(&self.rules[slot])
    }

    fn next_name(&mut self) -> String {
        loop {
            let name = format!("rule_{}", self.next_id);
            self.next_id += 1;
            if !self.index.contains_key(&name) {
                return name;
            }
        }
    }

    /// Find the first rule after `after` (or from the start) matching both
    /// `url` and `verb`.
    pub fn find(&self, verb: &str, url: &str, after: Option<&str>) -> Lookup<'_, T> {
        let start = match after {
            None => 0,
            Some(name) => match self.index.get(name) {
                Some(&slot) => slot + 1,
                None => return Lookup::NotFound,
            },
        };

        let Some(verb) = Verbs::from_method(verb).filter(|&v| self.verb_count(v) > 0) else {
            return Lookup::MethodNotAllowed(Verbs::empty());
        };

        let mut allowed = Verbs::empty();
        for rule in &self.rules[start..] {
            let Some(bindings) = rule.match_url(url) else {
                continue;
            };
            if rule.allows(verb) {
                log::trace!("{} {} matched rule {}", verb.names().join(","), url, rule.name());
                return Lookup::Found(RouteMatch { rule, bindings });
            }
            allowed |= rule.verbs();
        }

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }

    /// Every rule matching `url` and `verb`, in order.
    pub fn matches<'a>(&'a self, verb: &'a str, url: &'a str) -> Matches<'a, T> {
        Matches {
            router: self,
            verb,
            url,
            after: None,
            done: false,
        }
    }

    /// Reverse-route through the rule called `name`.
    pub fn build(&self, name: &str, args: &Bindings) -> Option<String> {
        self.rule(name).map(|rule| rule.build(args))
    }

    pub fn rule(&self, name: &str) -> Option<&Rule<T>> {
        self.index.get(name).map(|&slot| self.rules[slot].as_ref())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule<T>> {
        self.rules.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// How many rules accept a single verb.
    pub fn verb_count(&self, verb: Verbs) -> usize {
        verb.slot().map_or(0, |slot| self.verb_counts[slot])
    }
}

fn adjust_counts(counts: &mut [usize; VERB_COUNT], verbs: Verbs, add: bool) {
    for verb in verbs.iter() {
        if let Some(slot) = verb.slot() {
            counts[slot] = if add {
                counts[slot] + 1
            } else {
                counts[slot].saturating_sub(1)
            };
        }
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Iterator returned by [`Router::matches`].
pub struct Matches<'a, T> {
    router: &'a Router<T>,
    verb: &'a str,
    url: &'a str,
    after: Option<&'a str>,
    done: bool,
}

impl<'a, T> Iterator for Matches<'a, T> {
    type Item = RouteMatch<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.router.find(self.verb, self.url, self.after) {
            Lookup::Found(m) => {
                self.after = Some(m.name());
                Some(m)
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn get(name: &str) -> RuleData<()> {
        RuleData::new(()).name(name)
    }

    fn with(name: &str, verbs: Verbs) -> RuleData<()> {
        RuleData::new(()).name(name).verbs(verbs)
    }

    /// Recount from scratch and compare with the maintained table.
    fn assert_counts_consistent(router: &Router<()>) {
        let mut expected = [0usize; VERB_COUNT];
        for rule in router.rules() {
            adjust_counts(&mut expected, rule.verbs(), true);
        }
        assert_eq!(router.verb_counts, expected);
    }

    #[test]
    fn finds_first_matching_rule() {
        let mut router = Router::new();
        router.add_rule("/a/<x>", get("first")).expect("should add");
        router.add_rule("/a/<y>", get("second")).expect("should add");

        let m = router.find("GET", "/a/1", None).found().expect("should match");
        assert_eq!(m.name(), "first");
        assert_eq!(m.bindings.path["x"], json!("1"));
    }

    #[test]
    fn resumes_after_named_rule() {
        let mut router = Router::new();
        router.add_rule("/a/<x>", get("first")).expect("should add");
        router.add_rule("/a/<y>", get("second")).expect("should add");

        let m = router.find("GET", "/a/1", Some("first")).found().expect("should match");
        assert_eq!(m.name(), "second");
        assert!(matches!(router.find("GET", "/a/1", Some("second")), Lookup::NotFound));
        assert!(matches!(router.find("GET", "/a/1", Some("nope")), Lookup::NotFound));
    }

    #[test]
    fn method_not_allowed_lists_verbs_once() {
        let mut router = Router::new();
        router.add_rule("/r", with("a", Verbs::GET)).expect("should add");
        router.add_rule("/r", with("b", Verbs::GET | Verbs::PUT)).expect("should add");
        router.add_rule("/other", with("c", Verbs::POST)).expect("should add");

        match router.find("POST", "/r", None) {
            Lookup::MethodNotAllowed(verbs) => {
                assert_eq!(verbs.names(), vec!["GET", "HEAD", "PUT"]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn unhandled_verb_short_circuits() {
        let mut router = Router::new();
        router.add_rule("/r", get("a")).expect("should add");

        for verb in ["DELETE", "BREW"] {
            match router.find(verb, "/r", None) {
                Lookup::MethodNotAllowed(verbs) => assert!(verbs.is_empty()),
                other => panic!("expected MethodNotAllowed, got {other:?}"),
            }
        }
        assert!(router.find("get", "/r", None).is_found());
        assert!(router.find("HEAD", "/r", None).is_found());
        assert!(matches!(router.find("GET", "/missing", None), Lookup::NotFound));
    }

    #[test]
    fn replacement_keeps_position_and_counts() {
        let mut router = Router::new();
        router.add_rule("/a", with("a", Verbs::GET)).expect("should add");
        router.add_rule("/b", with("b", Verbs::POST)).expect("should add");

        for verbs in [Verbs::PUT, Verbs::GET | Verbs::DELETE, Verbs::POST, Verbs::PUT] {
            router.add_rule("/a2", with("a", verbs)).expect("should replace");
            assert_counts_consistent(&router);
        }

        assert_eq!(router.len(), 2);
        assert_eq!(router.rules().next().map(Rule::source), Some("/a2"));
        assert_eq!(router.verb_count(Verbs::GET), 0);
        assert_eq!(router.verb_count(Verbs::PUT), 1);
        assert_eq!(router.verb_count(Verbs::POST), 1);
        assert!(router.find("GET", "/a", None).found().is_none());
    }

    #[test]
    fn unnamed_rules_get_generated_names() {
        let mut router = Router::new();
        router.add_rule("/rule_0", get("rule_0")).expect("should add");
        let name = router
            .add_rule("/x", RuleData::new(()))
            .expect("should add")
            .name()
            .to_string();
        assert_eq!(name, "rule_1");

        let other = router
            .add_rule("/y", RuleData::new(()))
            .expect("should add")
            .name()
            .to_string();
        assert_eq!(other, "rule_2");
        assert_eq!(router.len(), 3);
    }

    #[test]
    fn failed_add_leaves_router_unchanged() {
        let mut router = Router::new();
        router.add_rule("/a", get("a")).expect("should add");

        assert!(router.add_rule("/(", get("a")).is_err());
        assert!(router.add_rule("/<Missing:x>", get("b")).is_err());
        assert_eq!(router.len(), 1);
        assert_eq!(router.rule("a").map(Rule::source), Some("/a"));
        assert_counts_consistent(&router);
    }

    #[test]
    fn register_kind_recompiles_rules() {
        let mut router = Router::new();
        router.register_kind("Id", "\\d+").expect("should register");
        router.add_rule("/n/<Id:id>", get("n")).expect("should add");
        assert!(router.find("GET", "/n/abc", None).found().is_none());

        router.register_kind("Id", "[a-z]+").expect("should register");
        assert!(router.find("GET", "/n/abc", None).is_found());
        assert!(router.find("GET", "/n/12", None).found().is_none());

        assert!(router.register_kind("Bad", "(x)").is_err());
        assert!(router.kinds().get("Bad").is_none());
    }

    #[test]
    fn matches_iterates_in_order() {
        let mut router = Router::new();
        router.add_rule("/p/<a>", get("one")).expect("should add");
        router.add_rule("/p/<b>", with("two", Verbs::POST)).expect("should add");
        router.add_rule("/p/(<c>)", get("three")).expect("should add");

        let names: Vec<&str> = router.matches("GET", "/p/x").map(|m| m.name()).collect();
        assert_eq!(names, vec!["one", "three"]);
    }

    #[test]
    fn builds_by_name() {
        let mut router = Router::new();
        router.add_rule("/post/<id>", get("post")).expect("should add");

        let args = match json!({"id": 9, "ref": "x"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(router.build("post", &args).as_deref(), Some("/post/9?ref=x"));
        assert_eq!(router.build("nope", &args), None);
    }
}
