//! JSON Pointer (RFC 6901) algebra over `serde_json::Value` trees.
//!
//! Everything here fails soft: malformed input yields `None` / `false` and a
//! `warn!`, never a panic. Two pointer flavors travel through the crate:
//! - indexed pointers name concrete array positions (`/tags/2`),
//! - generic pointers use `-` for list positions (`/tags/-`).
//!
//! The conversion between them lives in [`generic`]; the conversion between
//! data-shaped and schema-shaped pointers lives in [`schema`].
pub mod generic;
pub mod schema;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

pub use generic::{
    ArrayMap, RecursiveRefMap, index_array, remove_recursive_references, to_generic_pointer,
    to_indexed_pointer,
};
pub use schema::{to_canonical_schema_pointer, to_data_pointer, to_schema_pointer};

/// Keys that address (or create) an array slot.
static ARRAY_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+|-)$").expect("static regex"));

pub fn is_array_key(key: &str) -> bool {
    ARRAY_KEY.is_match(key)
}

// ------------------------------- Escaping --------------------------------- //

pub fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// `None` when a `~` is not followed by `0` or `1`.
pub fn unescape(key: &str) -> Option<String> {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

// --------------------------- Parse / compile ------------------------------ //

fn parse_quiet(pointer: &str) -> Option<Vec<String>> {
    let body = pointer.strip_prefix('#').unwrap_or(pointer);
    if body.is_empty() {
        return Some(Vec::new());
    }
    let rest = body.strip_prefix('/')?;
    rest.split('/').map(unescape).collect()
}

/// Split a pointer into unescaped keys. Accepts `""`, `/a/b` and the URI
/// fragment form `#/a/b`.
pub fn parse(pointer: &str) -> Option<Vec<String>> {
    let keys = parse_quiet(pointer);
    if keys.is_none() {
        warn!(pointer, "malformed JSON pointer");
    }
    keys
}

/// Join keys into a pointer; empty keys become `default_value`.
pub fn compile<S: AsRef<str>>(keys: &[S], default_value: &str) -> String {
    let mut out = String::new();
    for key in keys {
        let key = key.as_ref();
        out.push('/');
        if key.is_empty() {
            out.push_str(default_value);
        } else {
            out.push_str(&escape(key));
        }
    }
    out
}

/// Compile a pointer given either as a string or as a JSON array of keys.
/// Array members must be strings or non-negative integers.
pub fn compile_value(pointer: &Value) -> Option<String> {
    match pointer {
        Value::String(s) => normalize(s),
        Value::Array(items) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => keys.push(s.clone()),
                    Value::Number(n) if n.is_u64() => keys.push(n.to_string()),
                    other => {
                        warn!(key = %other, "JSON pointer key must be a string or an index");
                        return None;
                    }
                }
            }
            Some(compile(&keys, ""))
        }
        other => {
            warn!(pointer = %other, "not a JSON pointer");
            None
        }
    }
}

/// `compile(parse(p))`.
pub fn normalize(pointer: &str) -> Option<String> {
    parse(pointer).map(|keys| compile(&keys, ""))
}

pub fn is_json_pointer(pointer: &str) -> bool {
    parse_quiet(pointer).is_some()
}

/// True when `long` equals `short` or lies underneath it (segment-aware).
pub fn is_sub_pointer(short: &str, long: &str) -> bool {
    if short.is_empty() {
        return true;
    }
    long == short || (long.starts_with(short) && long[short.len()..].starts_with('/'))
}

/// Last key of the pointer.
pub fn to_key(pointer: &str) -> Option<String> {
    parse(pointer)?.pop()
}

/// Layout key syntax: `address.street`, `friends[0].name`, `tags[]`
/// (empty brackets become `-`). Strings starting with `/` are pointers.
pub fn parse_object_path(path: &str) -> Vec<String> {
    if path.starts_with('/') {
        return parse(path).unwrap_or_default();
    }
    let mut keys = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    keys.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    keys.push(std::mem::take(&mut current));
                }
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim_matches(|c| c == '\'' || c == '"');
                keys.push(if inner.is_empty() { "-".to_string() } else { inner.to_string() });
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        keys.push(current);
    }
    keys
}

// ------------------------------ Tree access ------------------------------- //

fn index_of(key: &str, len: usize) -> Option<usize> {
    if key == "-" {
        return len.checked_sub(1);
    }
    key.parse::<usize>().ok()
}

pub fn get_keys<'a, S: AsRef<str>>(tree: &'a Value, keys: &[S]) -> Option<&'a Value> {
    let mut current = tree;
    for key in keys {
        let key = key.as_ref();
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(index_of(key, items.len())?)?,
            _ => return None,
        };
    }
    Some(current)
}

pub fn get_keys_mut<'a, S: AsRef<str>>(tree: &'a mut Value, keys: &[S]) -> Option<&'a mut Value> {
    let mut current = tree;
    for key in keys {
        let key = key.as_ref();
        current = match current {
            Value::Object(map) => map.get_mut(key)?,
            Value::Array(items) => {
                let idx = index_of(key, items.len())?;
                items.get_mut(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// `-` reads the last element.
pub fn get<'a>(tree: &'a Value, pointer: &str) -> Option<&'a Value> {
    get_keys(tree, &parse(pointer)?)
}

pub fn get_mut<'a>(tree: &'a mut Value, pointer: &str) -> Option<&'a mut Value> {
    let keys = parse(pointer)?;
    get_keys_mut(tree, &keys)
}

pub fn has(tree: &Value, pointer: &str) -> bool {
    get(tree, pointer).is_some()
}

// Turn a scalar slot into the container `key` needs.
fn vivify(slot: &mut Value, key: &str) {
    if !slot.is_object() && !slot.is_array() {
        *slot = if is_array_key(key) { Value::Array(Vec::new()) } else { Value::Object(Map::new()) };
    }
}

fn child_slot<'a>(container: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match container {
        Value::Object(map) => Some(map.entry(key.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let idx = if key == "-" { items.len() } else { key.parse::<usize>().ok()? };
            if idx >= items.len() {
                items.resize(idx + 1, Value::Null);
            }
            items.get_mut(idx)
        }
        _ => None,
    }
}

/// Write `value` at `keys`, creating intermediate containers (array when the
/// following key looks like an index, object otherwise). `-` appends. With
/// `insert` an array target shifts later elements instead of overwriting.
pub fn set_keys<S: AsRef<str>>(tree: &mut Value, keys: &[S], value: Value, insert: bool) -> bool {
    let Some((last, parents)) = keys.split_last() else {
        *tree = value;
        return true;
    };
    let first = keys[0].as_ref();
    vivify(tree, first);
    let mut current = tree;
    for (i, key) in parents.iter().enumerate() {
        let Some(child) = child_slot(current, key.as_ref()) else {
            warn!(key = key.as_ref(), "cannot descend into array with a non-index key");
            return false;
        };
        vivify(child, keys[i + 1].as_ref());
        current = child;
    }
    let last = last.as_ref();
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return true;
            }
            let Ok(idx) = last.parse::<usize>() else {
                warn!(key = last, "array key must be an index or '-'");
                return false;
            };
            if insert && idx <= items.len() {
                items.insert(idx, value);
            } else {
                if idx >= items.len() {
                    items.resize(idx + 1, Value::Null);
                }
                items[idx] = value;
            }
            true
        }
        _ => false,
    }
}

pub fn set(tree: &mut Value, pointer: &str, value: Value, insert: bool) -> bool {
    match parse(pointer) {
        Some(keys) => set_keys(tree, &keys, value, insert),
        None => false,
    }
}

pub fn insert(tree: &mut Value, pointer: &str, value: Value) -> bool {
    set(tree, pointer, value, true)
}

/// Remove and return the value at `pointer`; `-` removes the last element.
pub fn remove(tree: &mut Value, pointer: &str) -> Option<Value> {
    let keys = parse(pointer)?;
    let (last, parents) = keys.split_last()?;
    match get_keys_mut(tree, parents)? {
        Value::Object(map) => map.shift_remove(last.as_str()),
        Value::Array(items) => {
            let idx = index_of(last, items.len())?;
            (idx < items.len()).then(|| items.remove(idx))
        }
        _ => None,
    }
}

/// Pre-order walk over every node with its indexed pointer.
pub fn for_each_deep(value: &Value, f: &mut impl FnMut(&Value, &str)) {
    fn walk(value: &Value, pointer: &mut String, f: &mut impl FnMut(&Value, &str)) {
        f(value, pointer.as_str());
        let len = pointer.len();
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    pointer.push('/');
                    pointer.push_str(&escape(k));
                    walk(v, pointer, f);
                    pointer.truncate(len);
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    pointer.push('/');
                    pointer.push_str(&i.to_string());
                    walk(v, pointer, f);
                    pointer.truncate(len);
                }
            }
            _ => {}
        }
    }
    let mut pointer = String::new();
    walk(value, &mut pointer, f);
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_reads_indices_and_last() {
        let obj = json!({"a": {"b": [1, 2, 3]}});
        assert_eq!(get(&obj, "/a/b/0"), Some(&json!(1)));
        assert_eq!(get(&obj, "/a/b/-"), Some(&json!(3)));
        assert_eq!(get(&obj, "/a/c"), None);
        assert_eq!(get(&obj, ""), Some(&obj));
    }

    #[test]
    fn parse_rejects_bad_escapes() {
        assert_eq!(parse("/a~2b"), None);
        assert_eq!(parse("/a~"), None);
        assert_eq!(parse("no-slash"), None);
        assert_eq!(parse("/a~1b/c~0d"), Some(vec!["a/b".to_string(), "c~d".to_string()]));
        assert_eq!(parse("#/definitions/x"), Some(vec!["definitions".to_string(), "x".to_string()]));
    }

    #[test]
    fn compile_escapes_and_defaults() {
        assert_eq!(compile(&["a/b", "", "c~"], "-"), "/a~1b/-/c~0");
        assert_eq!(compile::<&str>(&[], ""), "");
        assert_eq!(normalize("#/x/0"), Some("/x/0".to_string()));
    }

    #[test]
    fn compile_value_rejects_non_string_members() {
        assert_eq!(compile_value(&json!(["a", 0])), Some("/a/0".to_string()));
        assert_eq!(compile_value(&json!(["a", {"b": 1}])), None);
        assert_eq!(compile_value(&json!(["a", -1])), None);
        assert_eq!(compile_value(&json!(true)), None);
    }

    #[test]
    fn set_vivifies_by_next_key() {
        let mut tree = json!({});
        assert!(set(&mut tree, "/a/0/b", json!(1), false));
        assert!(set(&mut tree, "/c/d", json!("x"), false));
        assert_eq!(tree, json!({"a": [{"b": 1}], "c": {"d": "x"}}));
    }

    #[test]
    fn set_appends_and_inserts() {
        let mut tree = json!({"list": [1, 3]});
        assert!(set(&mut tree, "/list/-", json!(4), false));
        assert!(insert(&mut tree, "/list/1", json!(2)));
        assert_eq!(tree["list"], json!([1, 2, 3, 4]));
        assert!(set(&mut tree, "/list/0", json!(0), false));
        assert_eq!(tree["list"], json!([0, 2, 3, 4]));
        assert!(!set(&mut tree, "/list/x", json!(0), false));
    }

    #[test]
    fn set_pads_sparse_indices() {
        let mut tree = json!([]);
        assert!(set(&mut tree, "/2", json!("c"), false));
        assert_eq!(tree, json!([null, null, "c"]));
    }

    #[test]
    fn remove_handles_last_and_keys() {
        let mut tree = json!({"a": [1, 2, 3], "b": 1, "c": 2});
        assert_eq!(remove(&mut tree, "/a/-"), Some(json!(3)));
        assert_eq!(remove(&mut tree, "/a/0"), Some(json!(1)));
        assert_eq!(remove(&mut tree, "/b"), Some(json!(1)));
        assert_eq!(remove(&mut tree, "/zzz"), None);
        assert_eq!(tree, json!({"a": [2], "c": 2}));
        assert_eq!(tree.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn object_paths_become_keys() {
        assert_eq!(parse_object_path("address.street"), vec!["address", "street"]);
        assert_eq!(parse_object_path("tags[]"), vec!["tags", "-"]);
        assert_eq!(parse_object_path("friends[0].name"), vec!["friends", "0", "name"]);
        assert_eq!(parse_object_path("a['b.c']"), vec!["a", "b.c"]);
        assert_eq!(parse_object_path("/x/y"), vec!["x", "y"]);
    }

    #[test]
    fn sub_pointers_are_segment_aware() {
        assert!(is_sub_pointer("/a", "/a/b"));
        assert!(is_sub_pointer("/a", "/a"));
        assert!(!is_sub_pointer("/a", "/ab"));
        assert!(is_sub_pointer("", "/anything"));
    }

    #[test]
    fn for_each_deep_visits_with_pointers() {
        let tree = json!({"a": [1, {"b/c": 2}]});
        let mut seen = Vec::new();
        for_each_deep(&tree, &mut |_: &Value, p: &str| seen.push(p.to_string()));
        assert_eq!(seen, vec!["", "/a", "/a/0", "/a/1", "/a/1/b~1c"]);
    }
}
