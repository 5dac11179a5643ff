//! GraphSON type stripping
//!
//! Typed GraphSON values (`{"@type": ..., "@value": ...}`) are reduced to
//! plain JSON so result rows stay shape-agnostic.

use serde_json::{Map, Value};

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "@value";

/// Recursively replace typed values with their payload
pub fn untype(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.len() == 2 && map.contains_key(TYPE_KEY) && map.contains_key(VALUE_KEY) =>
        {
            let kind = map.remove(TYPE_KEY);
            let inner = map.remove(VALUE_KEY).unwrap_or(Value::Null);
            match kind.as_ref().and_then(Value::as_str) {
                Some("g:Map") => map_from_pairs(inner),
                _ => untype(inner),
            }
        }
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, untype(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(untype).collect()),
        other => other,
    }
}

/// `g:Map` payloads are flat `[k1, v1, k2, v2, ...]` lists
fn map_from_pairs(inner: Value) -> Value {
    let Value::Array(items) = inner else {
        return untype(inner);
    };

    let mut map = Map::new();
    let mut items = items.into_iter();
    while let Some(key) = items.next() {
        let value = items.next().map(untype).unwrap_or(Value::Null);
        let key = match untype(key) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        map.insert(key, value);
    }
    Value::Object(map)
}
