//! Bring older and newer drafts onto the single draft-07 dialect the
//! resolver and builders read.
//!
//! - draft-03 `required: true` on a property → parent `required` array
//! - draft-03 `divisibleBy` → `multipleOf`, `type: "any"` dropped
//! - draft-04 boolean `exclusiveMinimum` / `exclusiveMaximum` → numeric form
//! - 2020-12 `prefixItems` + `items` → tuple `items` + `additionalItems`
use serde_json::{Map, Value};

use super::{DEFINITION_KEYWORDS, SCHEMA_KEYWORDS, SCHEMA_LIST_KEYWORDS, SCHEMA_MAP_KEYWORDS};

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

pub fn normalize_draft(schema: &Value) -> Value {
    let mut out = schema.clone();
    normalize_node(&mut out);
    if let Some(map) = out.as_object_mut() {
        if map.contains_key("$schema") {
            map.insert("$schema".into(), Value::from(DRAFT_07));
        }
    }
    out
}

fn normalize_node(node: &mut Value) {
    let Value::Object(map) = node else { return };

    lift_boolean_required(map);

    if let Some(divisor) = map.shift_remove("divisibleBy") {
        map.entry("multipleOf").or_insert(divisor);
    }
    if map.get("type").and_then(Value::as_str) == Some("any") {
        map.shift_remove("type");
    }
    exclusive_bound(map, "exclusiveMinimum", "minimum");
    exclusive_bound(map, "exclusiveMaximum", "maximum");

    if let Some(prefix) = map.shift_remove("prefixItems") {
        let rest = map.shift_remove("items");
        map.insert("items".into(), prefix);
        if let Some(rest) = rest {
            map.insert("additionalItems".into(), rest);
        }
    }

    for (key, value) in map.iter_mut() {
        let key = key.as_str();
        if SCHEMA_MAP_KEYWORDS.contains(&key) || DEFINITION_KEYWORDS.contains(&key) {
            if let Value::Object(children) = value {
                children.values_mut().for_each(normalize_node);
            }
        } else if SCHEMA_LIST_KEYWORDS.contains(&key) && value.is_array() {
            if let Value::Array(children) = value {
                children.iter_mut().for_each(normalize_node);
            }
        } else if SCHEMA_KEYWORDS.contains(&key) {
            normalize_node(value);
        }
    }
}

fn lift_boolean_required(map: &mut Map<String, Value>) {
    let Some(Value::Object(props)) = map.get_mut("properties") else { return };
    let mut lifted = Vec::new();
    for (name, prop) in props.iter_mut() {
        let Some(prop) = prop.as_object_mut() else { continue };
        if let Some(Value::Bool(flag)) = prop.get("required").cloned() {
            prop.shift_remove("required");
            if flag {
                lifted.push(Value::from(name.clone()));
            }
        }
    }
    if lifted.is_empty() {
        return;
    }
    let required = map.entry("required").or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = required {
        for name in lifted {
            if !list.contains(&name) {
                list.push(name);
            }
        }
    }
}

fn exclusive_bound(map: &mut Map<String, Value>, exclusive: &str, bound: &str) {
    match map.get(exclusive) {
        Some(Value::Bool(true)) => match map.shift_remove(bound) {
            Some(limit) => {
                map.insert(exclusive.into(), limit);
            }
            None => {
                map.shift_remove(exclusive);
            }
        },
        Some(Value::Bool(false)) => {
            map.shift_remove(exclusive);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft3_required_flags_are_lifted() {
        let s = normalize_draft(&json!({
            "type": "object",
            "properties": {
                "a": { "type": "string", "required": true },
                "b": { "type": "string", "required": false },
                "required": { "type": "string" }
            }
        }));
        assert_eq!(s["required"], json!(["a"]));
        assert!(s["properties"]["a"].get("required").is_none());
        assert_eq!(s["properties"]["required"], json!({"type": "string"}));
    }

    #[test]
    fn prefix_items_become_tuples() {
        let s = normalize_draft(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "array",
            "prefixItems": [{ "type": "string" }, { "type": "number" }],
            "items": { "type": "boolean" }
        }));
        assert_eq!(s["items"], json!([{ "type": "string" }, { "type": "number" }]));
        assert_eq!(s["additionalItems"], json!({ "type": "boolean" }));
        assert_eq!(s["$schema"], json!(DRAFT_07));
    }

    #[test]
    fn draft4_bounds_and_legacy_keywords() {
        let s = normalize_draft(&json!({
            "type": "object",
            "properties": {
                "n": { "type": "number", "minimum": 1, "exclusiveMinimum": true, "divisibleBy": 2 },
                "divisibleBy": { "type": "any" }
            }
        }));
        assert_eq!(s["properties"]["n"], json!({ "type": "number", "exclusiveMinimum": 1, "multipleOf": 2 }));
        assert_eq!(s["properties"]["divisibleBy"], json!({}));
    }
}
