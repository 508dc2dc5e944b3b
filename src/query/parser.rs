//! Query-string to filter parsing.
//!
//! Follows the bracket conventions common to web query strings: `a=1`
//! plain keys, `a[]=1&a[]=2` arrays, `a[b][c]=1` nested objects, and
//! repeated plain keys collecting into arrays. Parsing is total: any
//! input, including malformed percent-escapes or unbalanced brackets,
//! degrades to a best-effort mapping instead of failing.

use serde_json::{Map, Value};

/// A structured filter parsed from a request query string.
///
/// Values are always strings, arrays of strings, or nested maps. Type
/// coercion for comparisons is the backing store's business.
pub type Filter = Map<String, Value>;

/// Parse the query component of a request URL (no leading `?`).
pub fn parse(raw: &str) -> Filter {
    let mut filter = Filter::new();
    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (key, value) = match segment.split_once('=') {
            Some((key, value)) => (key, value),
            None => (segment, ""),
        };
        let key = decode(key);
        let value = decode(value);
        let (root, path) = split_key(&key);
        if root.is_empty() {
            continue;
        }
        merge(&mut filter, root, &path, value);
    }
    filter
}

/// Percent-decode one component, treating `+` as space. Undecodable
/// input is kept verbatim.
fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// One step of a bracketed key path.
enum Segment {
    /// `[name]` descends into a nested map.
    Key(String),
    /// `[]` appends to an array.
    Append,
}

/// Split `a[b][]` into the root key and its bracket path.
///
/// Keys with unbalanced or trailing-text brackets are kept whole as a
/// literal root.
fn split_key(key: &str) -> (String, Vec<Segment>) {
    let literal = || (key.to_string(), Vec::new());
    let Some(open) = key.find('[') else {
        return literal();
    };
    if !key.ends_with(']') {
        return literal();
    }
    let root = key[..open].to_string();
    let mut path = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return literal();
        }
        let Some(close) = rest.find(']') else {
            return literal();
        };
        let inner = &rest[1..close];
        path.push(if inner.is_empty() {
            Segment::Append
        } else {
            Segment::Key(inner.to_string())
        });
        rest = &rest[close + 1..];
    }
    (root, path)
}

/// Merge one decoded pair into the filter, descending through the
/// bracket path. A later value of a different shape than the existing
/// entry replaces it.
fn merge(map: &mut Filter, key: String, path: &[Segment], value: String) {
    match path.first() {
        None => insert_scalar(map, key, value),
        Some(Segment::Append) => {
            let entry = map.entry(key).or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(items) = entry {
                items.push(Value::String(value));
            }
        }
        Some(Segment::Key(inner)) => {
            let entry = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                merge(nested, inner.clone(), &path[1..], value);
            }
        }
    }
}

/// Insert a plain `key=value` pair; a repeated key collects into an array.
fn insert_scalar(map: &mut Filter, key: String, value: String) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, Value::String(value));
        }
        Some(Value::Array(items)) => {
            items.push(Value::String(value));
        }
        Some(existing @ Value::String(_)) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
        Some(existing) => {
            *existing = Value::String(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_string_yields_empty_filter() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_plain_pairs() {
        let filter = parse("name=John&age=25");
        assert_eq!(Value::Object(filter), json!({"name": "John", "age": "25"}));
    }

    #[test]
    fn test_values_stay_strings() {
        let filter = parse("age=25&active=true");
        assert_eq!(filter["age"], json!("25"));
        assert_eq!(filter["active"], json!("true"));
    }

    #[test]
    fn test_missing_value_is_empty_string() {
        let filter = parse("name");
        assert_eq!(filter["name"], json!(""));
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let filter = parse("name=John+Smith&city=S%C3%A3o%20Paulo");
        assert_eq!(filter["name"], json!("John Smith"));
        assert_eq!(filter["city"], json!("S\u{e3}o Paulo"));
    }

    #[test]
    fn test_nested_bracket_keys() {
        let filter = parse("foo[bar]=1&foo[baz]=2");
        assert_eq!(Value::Object(filter), json!({"foo": {"bar": "1", "baz": "2"}}));
    }

    #[test]
    fn test_deep_nesting() {
        let filter = parse("a[b][c]=x");
        assert_eq!(Value::Object(filter), json!({"a": {"b": {"c": "x"}}}));
    }

    #[test]
    fn test_array_brackets() {
        let filter = parse("foo[]=1&foo[]=2");
        assert_eq!(filter["foo"], json!(["1", "2"]));
    }

    #[test]
    fn test_repeated_plain_keys_collect() {
        let filter = parse("a=1&a=2&a=3");
        assert_eq!(filter["a"], json!(["1", "2", "3"]));
    }

    #[test]
    fn test_unbalanced_brackets_become_literal_keys() {
        let filter = parse("a[b=1&x[y]z=2");
        assert_eq!(filter["a[b"], json!("1"));
        assert_eq!(filter["x[y]z"], json!("2"));
    }

    #[test]
    fn test_shape_conflict_last_wins() {
        let filter = parse("a=1&a[b]=2");
        assert_eq!(Value::Object(filter), json!({"a": {"b": "2"}}));
    }

    #[test]
    fn test_totality_on_garbage() {
        // None of these may panic; partial results are fine.
        for raw in ["%zz", "&&&", "=x", "a[[]]=1", "[]=1", "a%", "a=%"] {
            let _ = parse(raw);
        }
    }
}
