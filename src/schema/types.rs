//! Reading types, widgets and array shapes off a (resolved) schema node.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Structural kind of the control a schema node produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Group,
    Array,
    Leaf,
}

/// Declared types; when `type` is missing, inferred from the keywords
/// present.
pub fn schema_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ if schema.get("properties").is_some() || schema.get("additionalProperties").is_some() => {
            vec!["object"]
        }
        _ if schema.get("items").is_some() => vec!["array"],
        _ => Vec::new(),
    }
}

/// First non-null type.
pub fn primary_type(schema: &Value) -> Option<&str> {
    let types = schema_types(schema);
    types.iter().copied().find(|t| *t != "null").or_else(|| types.first().copied())
}

pub fn control_kind(schema: &Value) -> ControlKind {
    match primary_type(schema) {
        Some("object") => ControlKind::Group,
        Some("array") => ControlKind::Array,
        _ => ControlKind::Leaf,
    }
}

pub fn is_tuple(schema: &Value) -> bool {
    matches!(schema.get("items"), Some(Value::Array(_)))
}

pub fn tuple_len(schema: &Value) -> usize {
    match schema.get("items") {
        Some(Value::Array(tuple)) => tuple.len(),
        _ => 0,
    }
}

pub fn min_items(schema: &Value) -> usize {
    schema.get("minItems").and_then(Value::as_u64).unwrap_or(0) as usize
}

pub fn max_items(schema: &Value) -> Option<usize> {
    schema.get("maxItems").and_then(Value::as_u64).map(|n| n as usize)
}

/// Whether an array can grow past its tuple slots.
pub fn accepts_extra_items(schema: &Value) -> bool {
    match schema.get("items") {
        Some(Value::Array(_)) => schema.get("additionalItems").is_some_and(Value::is_object),
        Some(_) => true,
        None => false,
    }
}

/// Whether an array holding `count` items has room for one more: a free
/// tuple slot or a schema for extra items.
pub fn has_room_for_item(schema: &Value, count: usize) -> bool {
    count < tuple_len(schema) || accepts_extra_items(schema)
}

/// Relative schema keys of the item at `index` and the generic key it is
/// stored under (`"2"` for a tuple slot, `"-"` otherwise).
pub fn item_schema_keys(schema: &Value, index: usize) -> Option<(Vec<String>, String)> {
    match schema.get("items")? {
        Value::Array(tuple) if index < tuple.len() => {
            Some((vec!["items".into(), index.to_string()], index.to_string()))
        }
        Value::Array(_) => {
            schema.get("additionalItems").filter(|v| v.is_object())?;
            Some((vec!["additionalItems".into()], "-".into()))
        }
        _ => Some((vec!["items".into()], "-".into())),
    }
}

/// How many items an array starts with: the data's length when there is
/// data, otherwise enough to satisfy `minItems` (and `list_items` for
/// lists), never fewer than the tuple slots.
pub fn initial_item_count(schema: &Value, data: Option<&Value>, list_items: usize) -> usize {
    if let Some(Value::Array(items)) = data {
        return items.len();
    }
    let min = min_items(schema);
    if is_tuple(schema) {
        let len = tuple_len(schema);
        len + min.saturating_sub(len)
    } else {
        let count = min.max(list_items);
        max_items(schema).map_or(count, |max| count.min(max.max(min)))
    }
}

/// Data a group or array is built from: the supplied value, else the
/// schema `default` when defaults are on. `null` counts as absent.
pub fn container_seed<'v>(schema: &'v Value, data: Option<&'v Value>, use_default: bool) -> Option<&'v Value> {
    data.filter(|d| !d.is_null())
        .or_else(|| if use_default { schema.get("default") } else { None })
}

/// Widget tag for a schema node. `x-schema-form.type` / `widget` win; then
/// the type, format and enum decide.
pub fn input_type(schema: &Value) -> String {
    let hint = schema
        .get("x-schema-form")
        .and_then(|x| x.get("type").or_else(|| x.get("widget")))
        .or_else(|| schema.get("widget"))
        .and_then(Value::as_str);
    if let Some(hint) = hint {
        return hint.to_string();
    }
    let has_enum = schema.get("enum").is_some()
        || schema.get("x-schema-form").and_then(|x| x.get("titleMap")).is_some();
    let widget = match primary_type(schema) {
        Some("object") => "section",
        Some("array") => "array",
        Some("boolean") => "checkbox",
        Some("null") => "none",
        _ if has_enum => "select",
        Some(ty @ ("integer" | "number")) => {
            let bounded = schema.get("minimum").is_some() && schema.get("maximum").is_some();
            if bounded && (ty == "integer" || schema.get("multipleOf").is_some()) {
                "range"
            } else {
                ty
            }
        }
        Some("string") => match schema.get("format").and_then(Value::as_str) {
            Some("color") => "color",
            Some("date") => "date",
            Some("date-time") => "datetime-local",
            Some("email") => "email",
            Some("time") => "time",
            Some("uri" | "url") => "url",
            _ => "text",
        },
        _ => "text",
    };
    widget.to_string()
}

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("static regex"));

/// Human title from a property name: `firstName` / `first_name` → `First Name`.
pub fn fix_title(name: &str) -> String {
    let spaced = CAMEL_BOUNDARY.replace_all(name, "$1 $2").replace('_', " ");
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Value a freshly created leaf starts with when nothing else supplies one.
pub fn zero_value(schema: &Value) -> Value {
    match primary_type(schema) {
        Some("string") => Value::from(""),
        Some("boolean") => Value::Bool(false),
        _ => Value::Null,
    }
}

pub fn is_required(parent: &Value, name: &str) -> bool {
    parent
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|list| list.iter().any(|r| r.as_str() == Some(name)))
}
