//! Type-tolerant accessors for untyped attributes and relationships.
//!
//! Every accessor returns a zero value (`""`, `false`, `0`, `0.0`, empty
//! vec) when the key is missing, the value is `null`, or the value has a type
//! that cannot reasonably be coerced. The `opt_*` variants return `None` in
//! those cases instead, for callers that must tell "absent" from "zero".
//!
//! Numbers sent as strings (`"42"`, `"3.5"`) are accepted by the numeric
//! accessors, and booleans sent as `"true"`/`"false"` by the boolean ones.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::Relationship;

/// String attribute; numbers and booleans are rendered as text.
pub fn string_attr(attrs: &Map<String, Value>, key: &str) -> String {
    opt_string_attr(attrs, key).unwrap_or_default()
}

/// String attribute, `None` when absent, null, or not scalar.
pub fn opt_string_attr(attrs: &Map<String, Value>, key: &str) -> Option<String> {
    match attrs.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Boolean attribute; accepts `true`/`false` strings in any case.
pub fn bool_attr(attrs: &Map<String, Value>, key: &str) -> bool {
    opt_bool_attr(attrs, key).unwrap_or_default()
}

/// Boolean attribute, `None` when absent, null, or not boolean-like.
pub fn opt_bool_attr(attrs: &Map<String, Value>, key: &str) -> Option<bool> {
    match attrs.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Integer attribute; fractional values are truncated toward zero.
pub fn int_attr(attrs: &Map<String, Value>, key: &str) -> i64 {
    opt_int_attr(attrs, key).unwrap_or_default()
}

/// Integer attribute, `None` when absent, null, or unparseable.
pub fn opt_int_attr(attrs: &Map<String, Value>, key: &str) -> Option<i64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

/// Float attribute.
pub fn float_attr(attrs: &Map<String, Value>, key: &str) -> f64 {
    opt_float_attr(attrs, key).unwrap_or_default()
}

/// Float attribute, `None` when absent, null, or unparseable.
pub fn opt_float_attr(attrs: &Map<String, Value>, key: &str) -> Option<f64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// List-of-strings attribute.
///
/// Array elements are coerced like [`string_attr`]; nulls and nested values are
/// dropped. A bare non-empty string becomes a one-element list.
pub fn string_slice_attr(attrs: &Map<String, Value>, key: &str) -> Vec<String> {
    match attrs.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Check whether an attribute is present and not null.
pub fn has_attr(attrs: &Map<String, Value>, key: &str) -> bool {
    attrs.get(key).is_some_and(|v| !v.is_null())
}

/// Id of a to-one relationship; empty when absent, null, or to-many.
pub fn relationship_id(relationships: &HashMap<String, Relationship>, key: &str) -> String {
    relationships
        .get(key)
        .and_then(Relationship::as_one)
        .map(|identifier| identifier.id.clone())
        .unwrap_or_default()
}

/// Ids of a relationship; a to-one relationship yields its single id.
pub fn relationship_ids(relationships: &HashMap<String, Relationship>, key: &str) -> Vec<String> {
    relationships
        .get(key)
        .map(|rel| {
            rel.identifiers()
                .into_iter()
                .map(|identifier| identifier.id.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn truncate(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ResourceIdentifier;
    use serde_json::json;

    fn attrs() -> Map<String, Value> {
        match json!({
            "name": "Gravel",
            "count": 42,
            "count-text": " 42 ",
            "ratio": 0.25,
            "ratio-text": "0.25",
            "tons": 12.9,
            "archived": true,
            "archived-text": "FALSE",
            "nothing": null,
            "tags": ["a", 1, null, {"x": 1}, true],
            "single-tag": "solo",
            "nested": {"a": 1},
            "junk": "abc"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_string_attr() {
        let a = attrs();
        assert_eq!(string_attr(&a, "name"), "Gravel");
        assert_eq!(string_attr(&a, "count"), "42");
        assert_eq!(string_attr(&a, "archived"), "true");
        assert_eq!(string_attr(&a, "nested"), "");
        assert_eq!(opt_string_attr(&a, "nothing"), None);
    }

    #[test]
    fn test_numeric_coercion() {
        let a = attrs();
        assert_eq!(int_attr(&a, "count"), 42);
        assert_eq!(int_attr(&a, "count-text"), 42);
        assert_eq!(int_attr(&a, "tons"), 12);
        assert_eq!(int_attr(&a, "junk"), 0);
        assert_eq!(opt_int_attr(&a, "junk"), None);
        assert_eq!(float_attr(&a, "ratio"), 0.25);
        assert_eq!(float_attr(&a, "ratio-text"), 0.25);
        assert_eq!(float_attr(&a, "count"), 42.0);
        assert_eq!(float_attr(&a, "name"), 0.0);
    }

    #[test]
    fn test_bool_coercion() {
        let a = attrs();
        assert!(bool_attr(&a, "archived"));
        assert_eq!(opt_bool_attr(&a, "archived-text"), Some(false));
        assert!(!bool_attr(&a, "count"));
        assert_eq!(opt_bool_attr(&a, "junk"), None);
    }

    #[test]
    fn test_string_slice_attr() {
        let a = attrs();
        assert_eq!(string_slice_attr(&a, "tags"), vec!["a", "1", "true"]);
        assert_eq!(string_slice_attr(&a, "single-tag"), vec!["solo"]);
        assert!(string_slice_attr(&a, "count").is_empty());
    }

    #[test]
    fn test_missing_and_null_yield_zero_values() {
        let a = attrs();
        for key in ["missing", "nothing"] {
            assert_eq!(string_attr(&a, key), "");
            assert!(!bool_attr(&a, key));
            assert_eq!(int_attr(&a, key), 0);
            assert_eq!(float_attr(&a, key), 0.0);
            assert!(string_slice_attr(&a, key).is_empty());
            assert!(!has_attr(&a, key));
        }
        assert!(has_attr(&a, "name"));
    }

    #[test]
    fn test_relationship_helpers_tolerate_shape_mismatch() {
        let mut rels = HashMap::new();
        rels.insert(
            "one".to_string(),
            Relationship::ToOne(Some(ResourceIdentifier::new("sites", "5"))),
        );
        rels.insert("none".to_string(), Relationship::ToOne(None));
        rels.insert(
            "many".to_string(),
            Relationship::ToMany(vec![
                ResourceIdentifier::new("crews", "1"),
                ResourceIdentifier::new("crews", "2"),
            ]),
        );

        assert_eq!(relationship_id(&rels, "one"), "5");
        assert_eq!(relationship_id(&rels, "none"), "");
        assert_eq!(relationship_id(&rels, "many"), "");
        assert_eq!(relationship_id(&rels, "missing"), "");

        assert_eq!(relationship_ids(&rels, "many"), vec!["1", "2"]);
        assert_eq!(relationship_ids(&rels, "one"), vec!["5"]);
        assert!(relationship_ids(&rels, "none").is_empty());
        assert!(relationship_ids(&rels, "missing").is_empty());
    }
}
