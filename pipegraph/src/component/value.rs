//! Value model shared by declared arguments and exports.
//!
//! Declared config, resolved arguments, and exports are all JSON value
//! trees. A reference is a string of the form `"${<path>}"` where `<path>`
//! is a component id optionally followed by field segments into that
//! component's export, e.g. `"${static_value.targets.value}"`. The whole
//! string must be a single reference; partial interpolation inside a longer
//! string is not supported.
//!
//! Reference *extraction* is a static walk over the declared config used at
//! graph build time to derive edges. Reference *substitution* happens on
//! every evaluation, against the dependency's current export snapshot.

use serde_json::Value;

/// A component's exported value (and, by extension, any argument tree).
///
/// Exports are compared by value equality to decide whether dependents need
/// re-evaluation.
pub type ExportValue = Value;

/// Returns the reference path inside `s` if the string is a reference.
///
/// A reference is exactly `${...}` with a non-empty body; anything else is a
/// plain string value.
pub fn parse_reference(s: &str) -> Option<&str> {
    let body = s.strip_prefix("${")?.strip_suffix('}')?;
    if body.is_empty() {
        return None;
    }
    Some(body)
}

/// Collects every reference path in a declared config tree.
///
/// Order follows a depth-first walk; duplicates are preserved so callers can
/// decide how to dedupe.
pub fn collect_references(config: &Value) -> Vec<String> {
    let mut refs = Vec::new();
    walk_references(config, &mut refs);
    refs
}

fn walk_references(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if let Some(path) = parse_reference(s) {
                refs.push(path.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_references(item, refs);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                walk_references(item, refs);
            }
        }
        _ => {}
    }
}

/// Rebuilds `config` with every reference replaced by `lookup`'s result.
///
/// Non-reference values are cloned verbatim. The first lookup failure aborts
/// the substitution.
pub fn substitute_references<E>(
    config: &Value,
    lookup: &mut dyn FnMut(&str) -> Result<Value, E>,
) -> Result<Value, E> {
    match config {
        Value::String(s) => match parse_reference(s) {
            Some(path) => lookup(path),
            None => Ok(config.clone()),
        },
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(substitute_references(item, lookup)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), substitute_references(item, lookup)?);
            }
            Ok(Value::Object(out))
        }
        _ => Ok(config.clone()),
    }
}

/// Indexes into `value` by object-key segments.
///
/// An empty segment list returns `value` itself. Returns `None` when a
/// segment does not name a field of the current object.
pub fn lookup_path<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("${a.b.c}"), Some("a.b.c"));
        assert_eq!(parse_reference("${a}"), Some("a"));
        assert_eq!(parse_reference("plain"), None);
        assert_eq!(parse_reference("${}"), None);
        assert_eq!(parse_reference("prefix ${a}"), None);
        assert_eq!(parse_reference("${a} suffix"), None);
    }

    #[test]
    fn test_collect_references_walks_nested_structures() {
        let config = json!({
            "input": "${source.a.value}",
            "extra": ["${source.b.value}", "plain", 42],
            "nested": { "deep": "${source.a.value}" },
        });

        let refs = collect_references(&config);
        assert_eq!(refs.len(), 3);
        assert!(refs.contains(&"source.a.value".to_string()));
        assert!(refs.contains(&"source.b.value".to_string()));
    }

    #[test]
    fn test_substitute_references_replaces_in_place() {
        let config = json!({
            "input": "${src.value}",
            "keep": "literal",
            "list": [1, "${src.value}"],
        });

        let resolved = substitute_references::<()>(&config, &mut |path| {
            assert_eq!(path, "src.value");
            Ok(json!([10, 20]))
        })
        .unwrap();

        assert_eq!(
            resolved,
            json!({
                "input": [10, 20],
                "keep": "literal",
                "list": [1, [10, 20]],
            })
        );
    }

    #[test]
    fn test_substitute_references_propagates_lookup_error() {
        let config = json!({ "input": "${missing.value}" });
        let result = substitute_references(&config, &mut |_| Err("no export"));
        assert_eq!(result, Err("no export"));
    }

    #[test]
    fn test_lookup_path() {
        let export = json!({ "value": { "targets": [1, 2] } });

        assert_eq!(lookup_path(&export, &[]), Some(&export));
        assert_eq!(
            lookup_path(&export, &["value", "targets"]),
            Some(&json!([1, 2]))
        );
        assert_eq!(lookup_path(&export, &["value", "missing"]), None);
        assert_eq!(lookup_path(&export, &["value", "targets", "deep"]), None);
    }
}
