//! URL splitting and percent-encoding helpers
//!
//! Splitting works directly on string slices; encoding and decoding go
//! through `urlencoding` and never fail: undecodable input is returned as-is.

use std::borrow::Cow;

// =============================================================================
// Splitting
// =============================================================================

/// Split a URL at the first `?` into pathname and query.
#[inline]
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.find('?') {
        Some(pos) => (&url[..pos], Some(&url[pos + 1..])),
        None => (url, None),
    }
}

// =============================================================================
// Percent Encoding
// =============================================================================

/// Characters `urlencoding` escapes that stay literal in built URLs.
const KEPT: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode a component. `A-Z a-z 0-9 - _ . ~ ! ' ( ) *` are kept.
pub fn encode_component(value: &str) -> Cow<'_, str> {
    let encoded = urlencoding::encode(value);
    if !value.contains(&['!', '\'', '(', ')', '*'][..]) {
        return encoded;
    }

    // a literal `%` is always emitted as `%25`, so these triplets are unambiguous
    let mut restored = encoded.into_owned();
    for (escape, kept) in KEPT {
        restored = restored.replace(escape, kept);
    }
    Cow::Owned(restored)
}

/// Percent-encode a single character (upper-case hex).
pub fn encode_char(c: char) -> String {
    let mut buf = [0u8; 4];
    encode_component(c.encode_utf8(&mut buf)).into_owned()
}

/// Decode a path component. Malformed UTF-8 falls back to the raw text.
#[inline]
pub fn decode_component(value: &str) -> Cow<'_, str> {
    if !value.contains('%') {
        return Cow::Borrowed(value);
    }
    match urlencoding::decode(value) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(value),
    }
}

/// Decode a query component: `+` is a space, then percent-decoding.
pub fn decode_query_component(value: &str) -> Cow<'_, str> {
    if !value.contains('+') {
        return decode_component(value);
    }
    let spaced = value.replace('+', " ");
    Cow::Owned(decode_component(&spaced).into_owned())
}

// =============================================================================
// Query Strings
// =============================================================================

/// Parse `a=1&b&a=2` into decoded `(key, value)` pairs. Keys without `=` get
/// an empty value; empty segments are skipped.
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            (
                decode_query_component(key).into_owned(),
                decode_query_component(value).into_owned(),
            )
        })
        .collect()
}

/// Group pairs by key, keeping first-seen key order and value order.
pub fn group_query(pairs: Vec<(String, String)>) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => groups.push((key, vec![value])),
        }
    }
    groups
}
