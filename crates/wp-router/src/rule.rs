//! A single compiled route.
//!
//! A `Rule` owns everything derived from one pattern string: the parsed
//! tree, the compiled regex, the builder and the typed query slots, plus a
//! snapshot of the kinds it was compiled against. It is never mutated; a
//! kind change or a re-registration produces a new `Rule`.

use std::sync::Arc;

use serde_json::Value;

use wp_compiler::{CompiledPattern, QueryMatcher};
use wp_core::ast::Pattern;
use wp_core::backtrack;
use wp_core::binding::{assign_path, collect_path, merge_bindings, parse_query_object, Bindings};
use wp_core::error::Result;
use wp_core::kind::KindRegistry;
use wp_core::types::{CompileOptions, Verbs};
use wp_core::url::{decode_component, group_query, parse_query_pairs, split_url};

// =============================================================================
// Rule Data
// =============================================================================

/// Registration data attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleData<T> {
    /// Unique name within a router. Unnamed rules get one assigned.
    pub name: Option<String>,
    /// Accepted methods. GET always implies HEAD once compiled.
    pub verbs: Verbs,
    pub options: CompileOptions,
    /// Opaque host value (handler id, controller, ...).
    pub payload: T,
}

impl<T> RuleData<T> {
    pub fn new(payload: T) -> Self {
        Self {
            name: None,
            verbs: Verbs::default(),
            options: CompileOptions::default(),
            payload,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn verbs(mut self, verbs: Verbs) -> Self {
        self.verbs = verbs;
        self
    }

    pub fn options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }
}

impl<T: Default> Default for RuleData<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// Bindings produced by a successful match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMatch {
    pub path: Bindings,
    pub query: Bindings,
    /// `query` overlaid by `path`; path values win, except a `Null` from
    /// an optional capture that did not participate.
    pub merged: Bindings,
}

// =============================================================================
// Rule
// =============================================================================

#[derive(Debug)]
pub struct Rule<T> {
    source: String,
    name: String,
    pattern: Pattern,
    kinds: KindRegistry,
    compiled: CompiledPattern,
    data: Arc<RuleData<T>>,
}

impl<T> Rule<T> {
    /// Parse and compile `source` against `kinds`.
    ///
    /// A rule without a name is named after its pattern.
    pub fn new(source: &str, mut data: RuleData<T>, kinds: &KindRegistry) -> Result<Self> {
        data.verbs = data.verbs.normalized();
        let (pattern, compiled) = wp_compiler::compile(source, kinds, &data.options)?;
        let name = data.name.clone().unwrap_or_else(|| source.to_string());

        log::trace!("rule {:?} compiled to {}", name, compiled.path.source());
        Ok(Self {
            source: source.to_string(),
            name,
            pattern,
            kinds: kinds.clone(),
            compiled,
            data: Arc::new(data),
        })
    }

    /// The same rule compiled against a different kind set. The parsed tree
    /// and data are shared with `self`.
    pub fn recompile(&self, kinds: &KindRegistry) -> Result<Self> {
        let compiled = CompiledPattern::compile(&self.pattern, kinds, &self.data.options)?;
        Ok(Self {
            source: self.source.clone(),
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            kinds: kinds.clone(),
            compiled,
            data: Arc::clone(&self.data),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Source of the compiled path regex.
    pub fn regex_source(&self) -> &str {
        self.compiled.path.source()
    }

    pub fn data(&self) -> &RuleData<T> {
        &self.data
    }

    pub fn payload(&self) -> &T {
        &self.data.payload
    }

    pub fn verbs(&self) -> Verbs {
        self.data.verbs
    }

    /// Whether every method in `verb` is accepted.
    #[inline]
    pub fn allows(&self, verb: Verbs) -> bool {
        !verb.is_empty() && self.data.verbs.contains(verb)
    }

    /// Match a full URL (`path?query`).
    pub fn match_url(&self, url: &str) -> Option<RuleMatch> {
        let (pathname, query) = split_url(url);
        let captures = self.compiled.path.regex().captures(pathname)?;

        let mut path = Bindings::new();
        for (index, name) in self.compiled.path.groups().iter().enumerate() {
            let value = captures
                .get(index + 1)
                .map(|m| decode_component(m.as_str()).into_owned());
            collect_path(&mut path, name, value);
        }

        let query = self.match_query(query.unwrap_or(""))?;
        let merged = merge_bindings(&query, &path);
        Some(RuleMatch {
            path,
            query,
            merged,
        })
    }

    /// Reverse-build a URL from `args`.
    pub fn build(&self, args: &Bindings) -> String {
        self.compiled.builder.build(args)
    }

    fn match_query(&self, query: &str) -> Option<Bindings> {
        if self.compiled.query.is_empty() {
            return Some(parse_query_object(query));
        }

        let groups = group_query(parse_query_pairs(query));
        let mut out = Bindings::new();
        let mut seen: Vec<&str> = Vec::new();

        for matcher in &self.compiled.query {
            let name = matcher.name();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);

            let slots: Vec<&QueryMatcher> = self
                .compiled
                .query
                .iter()
                .filter(|m| m.name() == name)
                .collect();
            let values: &[String] = groups
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, values)| values.as_slice())
                .unwrap_or(&[]);

            let assigned = backtrack::assign(&slots, values)?;
            assign_path(&mut out, name, shape_query_value(&slots, &assigned, values));
        }
        Some(out)
    }
}

/// Turn per-slot token indexes into the bound value for one query name.
fn shape_query_value(slots: &[&QueryMatcher], assigned: &[Vec<usize>], values: &[String]) -> Value {
    let collective = slots.len() > 1 || slots.iter().any(|slot| slot.rule().multiple);

    if !collective {
        let default = slots.first().and_then(|slot| slot.rule().default.clone());
        return match assigned.first().and_then(|taken| taken.first()) {
            Some(&index) => Value::String(values[index].clone()),
            None => default.map_or(Value::Null, Value::String),
        };
    }

    let mut items = Vec::new();
    for (slot, taken) in slots.iter().zip(assigned) {
        if taken.is_empty() {
            if let Some(default) = &slot.rule().default {
                items.push(Value::String(default.clone()));
            }
        } else {
            items.extend(taken.iter().map(|&index| Value::String(values[index].clone())));
        }
    }

    if items.is_empty() {
        Value::Null
    } else {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rule(source: &str) -> Rule<()> {
        Rule::new(source, RuleData::new(()), &KindRegistry::new()).expect("rule should compile")
    }

    fn object(value: Value) -> Bindings {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn optional_param_binds_null_when_absent() {
        let r = rule("/post/(<postId>/)");

        let m = r.match_url("/post/").expect("should match");
        assert_eq!(m.path, object(json!({"postId": null})));

        let m = r.match_url("/post/42/").expect("should match");
        assert_eq!(m.path, object(json!({"postId": "42"})));

        assert!(r.match_url("/post/foo/bar/").is_none());
    }

    #[test]
    fn repeated_params_collect_into_arrays() {
        let r = rule("/<page>/(<page>/(<page>/))");

        let m = r.match_url("/foo/bar/baz/").expect("should match");
        assert_eq!(m.path, object(json!({"page": ["foo", "bar", "baz"]})));

        let m = r.match_url("/foo/").expect("should match");
        assert_eq!(m.path, object(json!({"page": "foo"})));
    }

    #[test]
    fn captures_are_decoded() {
        let r = rule("/tag/<name>");
        let m = r.match_url("/tag/a%20b").expect("should match");
        assert_eq!(m.path["name"], json!("a b"));

        let m = r.match_url("/tag/%E0%A4%A").expect("should match");
        assert_eq!(m.path["name"], json!("%E0%A4%A"));
    }

    #[test]
    fn dotted_names_nest() {
        let r = rule("/u/<user.id>/<user.tab>");
        let m = r.match_url("/u/7/posts").expect("should match");
        assert_eq!(m.path, object(json!({"user": {"id": "7", "tab": "posts"}})));
    }

    #[test]
    fn round_trips_fully_specified_params() {
        let r = rule("/post/<id>/<slug>");
        let m = r.match_url("/post/42/hello%20world").expect("should match");
        assert_eq!(r.build(&m.path), "/post/42/hello%20world");
    }

    #[test]
    fn query_staircase_backtracks() {
        let r = rule("/x&{1|2|3|4}:foo+&{2|3|4}:foo+&{3|4}:foo+&{4}:foo+");

        let m = r.match_url("/x?foo=1&foo=2&foo=3&foo=4").expect("should match");
        assert_eq!(m.query["foo"], json!(["1", "2", "3", "4"]));

        let url = "/x?foo=1&foo=5&foo=1&foo=2&foo=5&foo=5&foo=1&foo=5&foo=2&foo=3\
                   &foo=1&foo=5&foo=5&foo=2&foo=3&foo=5&foo=5&foo=4&foo=5";
        let m = r.match_url(url).expect("should match");
        assert_eq!(
            m.query["foo"],
            json!(["1", "1", "2", "1", "2", "3", "1", "2", "3", "4"])
        );
    }

    #[test]
    fn required_query_failure_rejects_match() {
        let r = rule("/s&{\\d+}:page");
        assert!(r.match_url("/s").is_none());
        assert!(r.match_url("/s?page=x").is_none());

        let m = r.match_url("/s?page=3").expect("should match");
        assert_eq!(m.query, object(json!({"page": "3"})));
    }

    #[test]
    fn optional_query_uses_default() {
        let r = rule("/s?sort=asc,desc?limit");

        let m = r.match_url("/s").expect("should match");
        assert_eq!(m.query, object(json!({"sort": "asc", "limit": null})));

        let m = r.match_url("/s?sort=desc&limit=10").expect("should match");
        assert_eq!(m.query, object(json!({"sort": "desc", "limit": "10"})));
    }

    #[test]
    fn untyped_query_falls_back_to_codec() {
        let r = rule("/s");
        let m = r.match_url("/s?a.b=1&c=x+y&c=z").expect("should match");
        assert_eq!(m.query, object(json!({"a": {"b": "1"}, "c": ["x y", "z"]})));
    }

    #[test]
    fn empty_string_is_not_absence() {
        let r = rule("/s?q=dflt");
        let m = r.match_url("/s?q=").expect("should match");
        assert_eq!(m.query["q"], json!(""));
    }

    #[test]
    fn path_wins_over_query() {
        let r = rule("/item/<id>");
        let m = r.match_url("/item/1?id=2&extra=3").expect("should match");
        assert_eq!(m.merged, object(json!({"id": "1", "extra": "3"})));
        assert_eq!(m.query["id"], json!("2"));
    }

    #[test]
    fn absent_optional_capture_keeps_query_value() {
        let r = rule("/post/(<id>/)");

        let m = r.match_url("/post/?id=5").expect("should match");
        assert_eq!(m.path, object(json!({"id": null})));
        assert_eq!(m.merged, object(json!({"id": "5"})));

        let m = r.match_url("/post/").expect("should match");
        assert_eq!(m.merged, object(json!({"id": null})));

        let m = r.match_url("/post/7/?id=5").expect("should match");
        assert_eq!(m.merged, object(json!({"id": "7"})));
    }

    #[test]
    fn get_implies_head() {
        let r = rule("/");
        assert!(r.allows(Verbs::GET));
        assert!(r.allows(Verbs::HEAD));
        assert!(!r.allows(Verbs::POST));
        assert!(!r.allows(Verbs::empty()));
    }

    #[test]
    fn recompile_keeps_data() {
        let mut kinds = KindRegistry::new();
        kinds.register("Id", "\\d+").expect("kind should register");
        let r: Rule<u32> =
            Rule::new("/n/<Id:id>", RuleData::new(7).name("n"), &kinds).expect("should compile");
        assert!(r.match_url("/n/ab").is_none());

        kinds.register("Id", "[a-z]+").expect("kind should register");
        let again = r.recompile(&kinds).expect("should recompile");
        assert!(again.match_url("/n/ab").is_some());
        assert_eq!(again.name(), "n");
        assert_eq!(*again.payload(), 7);
        assert_eq!(again.source(), r.source());
    }

    #[test]
    fn unnamed_rule_is_named_after_pattern() {
        assert_eq!(rule("/a/<b>").name(), "/a/<b>");
    }
}
