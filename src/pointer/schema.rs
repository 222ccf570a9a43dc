//! Data-shaped ↔ schema-shaped pointer translation.
//!
//! `/address/street` in the data is `/properties/address/properties/street`
//! in the schema. Locations with no data counterpart (`definitions`,
//! `additionalProperties`, `patternProperties`, `not`, `dependencies`) are
//! undecidable and translate to `None`.
use serde_json::Value;

use super::{RecursiveRefMap, compile, get_keys, parse};

const COMBINATORS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// Schema being walked plus the sentinel → ancestor map of its recursive
/// `$ref`s (empty for an unresolved schema).
struct Walk<'a> {
    root: &'a Value,
    recursive_refs: &'a RecursiveRefMap,
}

impl<'a> Walk<'a> {
    /// Follow a local `$ref` on `node`. A recursive sentinel jumps to the
    /// ancestor it re-enters; any other `$ref` to its literal target.
    fn follow_ref(&self, node: &'a Value, path: &mut Vec<String>) -> Option<&'a Value> {
        let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
            return Some(node);
        };
        let target = match self.recursive_refs.get(&compile(path.as_slice(), "")) {
            Some(ancestor) => parse(ancestor)?,
            None => parse(reference.strip_prefix('#')?)?,
        };
        let resolved = get_keys(self.root, &target)?;
        *path = target;
        Some(resolved)
    }

    /// One data key → schema keys appended to `path`.
    fn step(&self, node: &'a Value, key: &str, path: &mut Vec<String>) -> Option<&'a Value> {
        let node = self.follow_ref(node, path)?;
        if let Some(child) = node.get("properties").and_then(|p| p.get(key)) {
            path.push("properties".into());
            path.push(key.to_string());
            return Some(child);
        }
        let is_index = key == "-" || key.parse::<usize>().is_ok();
        if is_index {
            match node.get("items") {
                Some(Value::Array(tuple)) => {
                    if let Some(child) = key.parse::<usize>().ok().and_then(|i| tuple.get(i)) {
                        path.push("items".into());
                        path.push(key.to_string());
                        return Some(child);
                    }
                    let extra = node.get("additionalItems").filter(|v| v.is_object())?;
                    path.push("additionalItems".into());
                    return Some(extra);
                }
                Some(items @ Value::Object(_)) => {
                    path.push("items".into());
                    return Some(items);
                }
                _ => {}
            }
        }
        for combinator in COMBINATORS {
            let Some(Value::Array(arms)) = node.get(combinator) else { continue };
            for (i, arm) in arms.iter().enumerate() {
                let mut candidate = path.clone();
                candidate.push(combinator.to_string());
                candidate.push(i.to_string());
                if let Some(found) = self.step(arm, key, &mut candidate) {
                    *path = candidate;
                    return Some(found);
                }
            }
        }
        None
    }

    fn schema_pointer(&self, data_pointer: &str) -> Option<String> {
        let keys = parse(data_pointer)?;
        let mut path: Vec<String> = Vec::new();
        let mut node = self.root;
        for key in &keys {
            node = self.step(node, key, &mut path)?;
        }
        Some(compile(&path, ""))
    }
}

/// Schema pointer for a (generic or indexed) data pointer. `$ref`s are
/// followed to their literal targets; see [`to_canonical_schema_pointer`]
/// for a resolved schema.
pub fn to_schema_pointer(data_pointer: &str, schema: &Value) -> Option<String> {
    Walk { root: schema, recursive_refs: &RecursiveRefMap::new() }.schema_pointer(data_pointer)
}

/// Schema pointer for a data pointer into a resolved schema. Every recursive
/// sentinel on the way maps to the ancestor it re-enters, so the result is
/// the canonical location and never a raw `definitions` entry.
pub fn to_canonical_schema_pointer(
    data_pointer: &str,
    schema: &Value,
    recursive_refs: &RecursiveRefMap,
) -> Option<String> {
    Walk { root: schema, recursive_refs }.schema_pointer(data_pointer)
}

/// Generic data pointer for a schema pointer, `None` where undecidable.
pub fn to_data_pointer(schema_pointer: &str, schema: &Value) -> Option<String> {
    let keys = parse(schema_pointer)?;
    let mut data: Vec<String> = Vec::new();
    let mut node = schema;
    let mut i = 0;
    while i < keys.len() {
        let key = keys[i].as_str();
        match key {
            "properties" => {
                let name = keys.get(i + 1)?;
                node = node.get("properties")?.get(name)?;
                data.push(name.clone());
                i += 2;
            }
            "items" => {
                let items = node.get("items")?;
                if let Value::Array(tuple) = items {
                    let slot = keys.get(i + 1)?;
                    node = tuple.get(slot.parse::<usize>().ok()?)?;
                    data.push(slot.clone());
                    i += 2;
                } else {
                    node = items;
                    data.push("-".into());
                    i += 1;
                }
            }
            "additionalItems" => {
                node = node.get("additionalItems")?;
                data.push("-".into());
                i += 1;
            }
            "allOf" | "anyOf" | "oneOf" => {
                let slot = keys.get(i + 1)?.parse::<usize>().ok()?;
                node = node.get(key)?.get(slot)?;
                i += 2;
            }
            "if" | "then" | "else" => {
                node = node.get(key)?;
                i += 1;
            }
            // definitions, $defs, additionalProperties, patternProperties,
            // not, dependencies and anything unknown
            _ => return None,
        }
    }
    Some(compile(&data, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "object",
            "definitions": { "leaf": { "type": "string" } },
            "properties": {
                "name": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "row": {
                    "type": "array",
                    "items": [{ "type": "string" }, { "type": "number" }],
                    "additionalItems": { "type": "boolean" }
                },
                "extra": { "type": "object", "additionalProperties": { "type": "string" } },
                "choice": { "anyOf": [
                    { "properties": { "a": { "type": "string" } } },
                    { "properties": { "b": { "type": "number" } } }
                ] }
            }
        })
    }

    #[test]
    fn data_to_schema() {
        let s = sample();
        assert_eq!(to_schema_pointer("/name", &s).as_deref(), Some("/properties/name"));
        assert_eq!(to_schema_pointer("/tags/3", &s).as_deref(), Some("/properties/tags/items"));
        assert_eq!(to_schema_pointer("/tags/-", &s).as_deref(), Some("/properties/tags/items"));
        assert_eq!(to_schema_pointer("/row/1", &s).as_deref(), Some("/properties/row/items/1"));
        assert_eq!(to_schema_pointer("/row/4", &s).as_deref(), Some("/properties/row/additionalItems"));
        assert_eq!(to_schema_pointer("/choice/b", &s).as_deref(), Some("/properties/choice/anyOf/1/properties/b"));
        assert_eq!(to_schema_pointer("/extra/anything", &s), None);
    }

    #[test]
    fn schema_to_data() {
        let s = sample();
        assert_eq!(to_data_pointer("/properties/tags/items", &s).as_deref(), Some("/tags/-"));
        assert_eq!(to_data_pointer("/properties/row/items/0", &s).as_deref(), Some("/row/0"));
        assert_eq!(to_data_pointer("/properties/row/additionalItems", &s).as_deref(), Some("/row/-"));
        assert_eq!(to_data_pointer("/properties/choice/anyOf/0/properties/a", &s).as_deref(), Some("/choice/a"));
        assert_eq!(to_data_pointer("", &s).as_deref(), Some(""));
    }

    #[test]
    fn ambiguous_locations_are_undecidable() {
        let s = sample();
        assert_eq!(to_data_pointer("/definitions/leaf", &s), None);
        assert_eq!(to_data_pointer("/properties/extra/additionalProperties", &s), None);
    }

    #[test]
    fn recursive_sentinels_are_followed() {
        let s = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "children": { "type": "array", "items": { "$ref": "#" } }
            }
        });
        assert_eq!(to_schema_pointer("/children/0/children/2/name", &s).as_deref(), Some("/properties/name"));
    }

    #[test]
    fn sentinels_map_to_their_ancestor() {
        let s = json!({
            "definitions": { "node": { "type": "object" } },
            "properties": {
                "root": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "next": { "type": "array", "items": { "$ref": "#/definitions/node" } }
                    }
                }
            }
        });
        let refs: RecursiveRefMap =
            [("/properties/root/properties/next/items".to_string(), "/properties/root".to_string())].into_iter().collect();
        assert_eq!(to_schema_pointer("/root/next/0/label", &s), None);
        assert_eq!(
            to_canonical_schema_pointer("/root/next/0/next/1/label", &s, &refs).as_deref(),
            Some("/properties/root/properties/label")
        );
        assert_eq!(
            to_canonical_schema_pointer("/root/next/-", &s, &refs).as_deref(),
            Some("/properties/root/properties/next/items")
        );
    }
}
