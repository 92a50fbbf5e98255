//! Match bindings.
//!
//! Bindings are insertion-ordered JSON maps: strings, arrays of strings,
//! nested objects for dot-separated names, and `Null` for absent values.

use serde_json::{Map, Value};

use crate::url::{group_query, parse_query_pairs};

/// Argument/binding map.
pub type Bindings = Map<String, Value>;

/// Walk (creating as needed) to the object that owns the last segment of a
/// dotted name, returning it with that segment.
fn parent_mut<'a, 'n>(map: &'a mut Bindings, name: &'n str) -> (&'a mut Bindings, &'n str) {
    let mut segments: Vec<&str> = name.split('.').collect();
    let last = segments.pop().unwrap_or(name);

    let mut current = map;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(inner) => inner,
            _ => unreachable!("slot was just made an object"),
        };
    }
    (current, last)
}

/// Set a dotted name, replacing whatever was there.
pub fn assign_path(map: &mut Bindings, name: &str, value: Value) {
    let (parent, key) = parent_mut(map, name);
    parent.insert(key.to_string(), value);
}

/// Accumulate a captured value under a dotted name.
///
/// The first value binds a string; later values turn it into an array in
/// encounter order. `None` binds `Null` only if nothing is bound yet.
pub fn collect_path(map: &mut Bindings, name: &str, value: Option<String>) {
    let (parent, key) = parent_mut(map, name);
    let Some(value) = value else {
        parent.entry(key.to_string()).or_insert(Value::Null);
        return;
    };

    match parent.get_mut(key) {
        None | Some(Value::Null) => {
            parent.insert(key.to_string(), Value::String(value));
        }
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, Value::String(value)]);
        }
    }
}

/// Look up a dotted name: an exact top-level key wins, then nested objects.
pub fn lookup_path<'a>(map: &'a Bindings, name: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(name) {
        return Some(value);
    }
    if !name.contains('.') {
        return None;
    }

    let mut segments = name.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Overlay `top` onto `base`. Objects merge recursively; on any other
/// collision the value from `top` wins unless it is `Null` (absent).
pub fn merge_bindings(base: &Bindings, top: &Bindings) -> Bindings {
    let mut merged = base.clone();
    for (key, value) in top {
        let combined = match (merged.get(key), value) {
            (Some(_), Value::Null) => continue,
            (Some(Value::Object(under)), Value::Object(over)) => {
                Value::Object(merge_bindings(under, over))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

/// Parse a query string into nested bindings (`a.b.c=v` → `{a: {b: {c: v}}}`).
/// Repeated keys collect into arrays.
pub fn parse_query_object(query: &str) -> Bindings {
    let mut out = Bindings::new();
    for (key, values) in group_query(parse_query_pairs(query)) {
        if key.is_empty() {
            continue;
        }
        let value = if values.len() == 1 {
            Value::String(values.into_iter().next().unwrap_or_default())
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        };
        assign_path(&mut out, &key, value);
    }
    out
}

/// Stringify a scalar the way a query serializer would; objects, nulls and
/// non-finite numbers become empty.
pub fn stringify_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if !n.is_f64() => n.to_string(),
        // `f64` display drops the `.0` of integral values
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => "0".to_string(),
            Some(f) if f.is_finite() => f.to_string(),
            _ => String::new(),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Bindings {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_collect_repeated_names() {
        let mut map = Bindings::new();
        collect_path(&mut map, "page", Some("foo".into()));
        collect_path(&mut map, "page", Some("bar".into()));
        collect_path(&mut map, "page", None);
        collect_path(&mut map, "page", Some("baz".into()));
        assert_eq!(Value::Object(map), json!({"page": ["foo", "bar", "baz"]}));
    }

    #[test]
    fn test_collect_absent_and_empty() {
        let mut map = Bindings::new();
        collect_path(&mut map, "id", None);
        collect_path(&mut map, "empty", Some(String::new()));
        assert_eq!(Value::Object(map), json!({"id": null, "empty": ""}));
    }

    #[test]
    fn test_dotted_names_nest() {
        let mut map = Bindings::new();
        collect_path(&mut map, "user.id", Some("7".into()));
        assign_path(&mut map, "user.name", json!("ann"));
        assert_eq!(Value::Object(map.clone()), json!({"user": {"id": "7", "name": "ann"}}));
        assert_eq!(lookup_path(&map, "user.id"), Some(&json!("7")));
        assert_eq!(lookup_path(&map, "user.age"), None);
    }

    #[test]
    fn test_merge_prefers_top() {
        let base = object(json!({"a": "q", "n": {"x": "1", "y": "2"}, "q": "only"}));
        let top = object(json!({"a": "p", "n": {"x": "9"}}));
        let merged = merge_bindings(&base, &top);
        assert_eq!(
            Value::Object(merged),
            json!({"a": "p", "n": {"x": "9", "y": "2"}, "q": "only"})
        );
    }

    #[test]
    fn test_merge_keeps_base_over_null() {
        let base = object(json!({"id": "5", "n": {"x": "1"}}));
        let top = object(json!({"id": null, "n": {"x": null}, "new": null}));
        let merged = merge_bindings(&base, &top);
        assert_eq!(
            Value::Object(merged),
            json!({"id": "5", "n": {"x": "1"}, "new": null})
        );
    }

    #[test]
    fn test_parse_query_object() {
        let parsed = parse_query_object("a.b.c=v&x=1&x=2&flag");
        assert_eq!(
            Value::Object(parsed),
            json!({"a": {"b": {"c": "v"}}, "x": ["1", "2"], "flag": ""})
        );
    }

    #[test]
    fn test_stringify_scalar() {
        assert_eq!(stringify_scalar(&json!("s")), "s");
        assert_eq!(stringify_scalar(&json!(true)), "true");
        assert_eq!(stringify_scalar(&json!(42)), "42");
        assert_eq!(stringify_scalar(&json!(-7)), "-7");
        assert_eq!(stringify_scalar(&json!(2.0)), "2");
        assert_eq!(stringify_scalar(&json!(-0.0)), "0");
        assert_eq!(stringify_scalar(&json!(1.5)), "1.5");
        assert_eq!(stringify_scalar(&json!({"a": 1})), "");
        assert_eq!(stringify_scalar(&Value::Null), "");
    }
}
