//! Raw control values → schema-typed data.
use serde_json::{Map, Number, Value};

use crate::data_map::DataMap;
use crate::pointer::escape;
use crate::schema::ResolvedSchema;
use crate::schema::types::{ControlKind, control_kind, schema_types};

/// Walk `raw` (the control tree's value) and coerce every leaf to its
/// schema type. Empty leaves (`null`, `""`) are dropped from objects unless
/// `return_empty_fields`; inside arrays they become `null` so positions
/// keep their meaning.
pub fn format_data(raw: &Value, resolved: &ResolvedSchema, data_map: &DataMap, return_empty_fields: bool) -> Value {
    let ctx = Formatter { resolved, data_map, return_empty_fields };
    ctx.format(raw, "")
}

struct Formatter<'a> {
    resolved: &'a ResolvedSchema,
    data_map: &'a DataMap,
    return_empty_fields: bool,
}

impl Formatter<'_> {
    fn format(&self, value: &Value, pointer: &str) -> Value {
        // items added after the last build may have no entry yet
        let entry = self.data_map.lookup(pointer, self.resolved);
        let schema = entry
            .and_then(|e| e.schema_pointer.as_deref())
            .and_then(|sp| self.resolved.schema_at(sp))
            .or_else(|| {
                let sp = self.resolved.schema_pointer_for(pointer)?;
                self.resolved.schema_at(self.resolved.expansion_pointer(&sp))
            });
        let is_leaf = match entry.and_then(|e| e.kind).or_else(|| schema.map(control_kind)) {
            Some(kind) => kind == ControlKind::Leaf,
            None => !value.is_object() && !value.is_array(),
        };
        if is_leaf {
            let types = schema.map(schema_types).unwrap_or_default();
            return to_schema_type(value, &types);
        }
        match value {
            Value::Object(members) => {
                let mut out = Map::new();
                for (key, member) in members {
                    let child = self.format(member, &format!("{pointer}/{}", escape(key)));
                    if self.return_empty_fields || !is_empty(&child) {
                        out.insert(key.clone(), child);
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let child = self.format(item, &format!("{pointer}/{i}"));
                        if is_empty(&child) && !self.return_empty_fields { Value::Null } else { child }
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Coerce one raw value to the first of `types` it fits. Values that fit
/// none are returned unchanged for the validator to report.
pub fn to_schema_type(value: &Value, types: &[&str]) -> Value {
    if types.is_empty() {
        return value.clone();
    }
    let has = |t: &str| types.contains(&t);
    match value {
        Value::String(s) => {
            let s = s.trim();
            if has("integer") || has("number") {
                if let Ok(i) = s.parse::<i64>() {
                    return Value::from(i);
                }
            }
            if has("number") {
                if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
                    return Value::Number(n);
                }
            }
            if has("string") {
                return value.clone();
            }
            if has("boolean") {
                match s.to_ascii_lowercase().as_str() {
                    "true" | "1" | "on" => return Value::Bool(true),
                    "false" | "0" | "off" => return Value::Bool(false),
                    _ => {}
                }
            }
            if s.is_empty() || (has("null") && s == "null") {
                return Value::Null;
            }
            value.clone()
        }
        Value::Number(n) => {
            if has("number") {
                return value.clone();
            }
            if has("integer") {
                return match n.as_f64() {
                    Some(f) if n.is_f64() && f.fract() == 0.0 => Value::from(f as i64),
                    _ => value.clone(),
                };
            }
            if has("string") {
                return Value::from(n.to_string());
            }
            if has("boolean") {
                return Value::Bool(n.as_f64() != Some(0.0));
            }
            value.clone()
        }
        Value::Bool(b) => {
            if has("boolean") {
                return value.clone();
            }
            if has("integer") || has("number") {
                return Value::from(i64::from(*b));
            }
            if has("string") {
                return Value::from(b.to_string());
            }
            value.clone()
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlTreeBuilder;
    use crate::options::FormOptions;
    use crate::schema::resolve_schema;
    use serde_json::json;

    #[test]
    fn coercions() {
        assert_eq!(to_schema_type(&json!("42"), &["integer"]), json!(42));
        assert_eq!(to_schema_type(&json!("4.5"), &["number"]), json!(4.5));
        assert_eq!(to_schema_type(&json!("4.5"), &["integer"]), json!("4.5"));
        assert_eq!(to_schema_type(&json!("on"), &["boolean"]), json!(true));
        assert_eq!(to_schema_type(&json!("0"), &["boolean"]), json!(false));
        assert_eq!(to_schema_type(&json!(""), &["integer"]), Value::Null);
        assert_eq!(to_schema_type(&json!("7"), &["string", "integer"]), json!(7));
        assert_eq!(to_schema_type(&json!("x"), &["string", "null"]), json!("x"));
        assert_eq!(to_schema_type(&json!(3.0), &["integer"]), json!(3));
        assert_eq!(to_schema_type(&json!(3), &["string"]), json!("3"));
        assert_eq!(to_schema_type(&json!(true), &["integer"]), json!(1));
        assert_eq!(to_schema_type(&json!({ "a": 1 }), &["string"]), json!({ "a": 1 }));
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "age": { "type": "integer" },
                "name": { "type": "string" },
                "scores": { "type": "array", "items": { "type": "number" } },
                "kids": { "type": "array", "items": { "$ref": "#" } }
            }
        })
    }

    #[test]
    fn formats_against_the_data_map() {
        let resolved = resolve_schema(&schema()).unwrap();
        let mut dm = DataMap::new();
        let options = FormOptions::default();
        let data = json!({ "kids": [{ "age": 3 }] });
        ControlTreeBuilder::new(&resolved, &options, &mut dm).build_root(Some(&data));

        let raw = json!({
            "age": "41",
            "name": "",
            "scores": ["1.5", "", "2"],
            "kids": [{ "age": "7", "name": "", "scores": [], "kids": [] }]
        });
        assert_eq!(
            format_data(&raw, &resolved, &dm, false),
            json!({ "age": 41, "scores": [1.5, null, 2], "kids": [{ "age": 7, "scores": [], "kids": [] }] })
        );
        let kept = format_data(&raw, &resolved, &dm, true);
        assert_eq!(kept["name"], json!(""));
        assert_eq!(kept["scores"], json!([1.5, null, 2]));
    }
}
