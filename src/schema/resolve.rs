//! Local `$ref` resolution.
//!
//! Every non-recursive reference is inlined, with sibling keywords of the
//! `$ref` overlaid on the target. A reference whose target is an ancestor of
//! the location being walked is recursive: it stays a `{"$ref": ...}`
//! sentinel and is recorded in the recursive-ref maps so the builders can
//! expand it one level at a time.
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{
    DEFINITION_KEYWORDS, ResolvedSchema, SCHEMA_KEYWORDS, SCHEMA_LIST_KEYWORDS, SCHEMA_MAP_KEYWORDS,
    SchemaRefLibrary,
};
use crate::error::{FormError, Result};
use crate::pointer::{self, ArrayMap, RecursiveRefMap, escape, to_data_pointer};

/// A schema object on the walk path: where it came from in the input, and
/// where it ends up in the resolved output.
struct Frame {
    original: String,
    resolved: String,
}

struct Resolver<'a> {
    root: &'a Value,
    stack: Vec<Frame>,
    library: SchemaRefLibrary,
    recursive: RecursiveRefMap,
    array_schemas: Vec<String>,
    has_root_reference: bool,
}

pub fn resolve_schema(raw: &Value) -> Result<ResolvedSchema> {
    if !raw.is_object() && !raw.is_boolean() {
        return Err(FormError::InvalidSchema(format!("expected an object or boolean schema, got {raw}")));
    }
    let mut resolver = Resolver {
        root: raw,
        stack: Vec::new(),
        library: SchemaRefLibrary::new(),
        recursive: RecursiveRefMap::new(),
        array_schemas: Vec::new(),
        has_root_reference: false,
    };
    let schema = resolver.walk(raw, "", "")?;
    let Resolver { mut library, recursive, array_schemas, has_root_reference, .. } = resolver;

    let mut data_recursive_refs = RecursiveRefMap::new();
    for (location, target) in &recursive {
        if let Some(body) = pointer::get(&schema, target) {
            library.insert(location.clone(), body.clone());
        }
        match (to_data_pointer(location, &schema), to_data_pointer(target, &schema)) {
            (Some(from), Some(to)) => {
                data_recursive_refs.insert(from, to);
            }
            _ => debug!(location, target, "recursive $ref has no data location"),
        }
    }

    let mut array_map = ArrayMap::new();
    for schema_pointer in &array_schemas {
        let Some(node) = pointer::get(&schema, schema_pointer) else { continue };
        let Some(data_pointer) = to_data_pointer(schema_pointer, &schema) else { continue };
        let tuple_items = match node.get("items") {
            Some(Value::Array(tuple)) => tuple.len(),
            _ => 0,
        };
        array_map.register(data_pointer, tuple_items);
    }

    info!(
        refs = library.len(),
        recursive = recursive.len(),
        arrays = array_map.len(),
        has_root_reference,
        "resolved schema"
    );
    Ok(ResolvedSchema {
        schema,
        ref_library: library,
        schema_recursive_refs: recursive,
        data_recursive_refs,
        array_map,
        has_root_reference,
    })
}

impl Resolver<'_> {
    fn walk(&mut self, node: &Value, original: &str, resolved: &str) -> Result<Value> {
        let Value::Object(map) = node else {
            return Ok(node.clone());
        };
        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return self.resolve_ref(map, reference, original, resolved);
        }

        self.stack.push(Frame { original: original.to_string(), resolved: resolved.to_string() });
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            let child = self.walk_keyword(key, value, original, resolved)?;
            out.insert(key.clone(), child);
        }
        self.stack.pop();

        if out.contains_key("items") {
            self.array_schemas.push(resolved.to_string());
        }
        Ok(Value::Object(out))
    }

    fn walk_keyword(&mut self, key: &str, value: &Value, original: &str, resolved: &str) -> Result<Value> {
        let original = format!("{original}/{}", escape(key));
        let resolved = format!("{resolved}/{}", escape(key));

        if DEFINITION_KEYWORDS.contains(&key) {
            return Ok(value.clone());
        }
        if SCHEMA_MAP_KEYWORDS.contains(&key) {
            let Value::Object(children) = value else { return Ok(value.clone()) };
            let mut out = Map::with_capacity(children.len());
            for (name, child) in children {
                let o = format!("{original}/{}", escape(name));
                let r = format!("{resolved}/{}", escape(name));
                // `dependencies` mixes schemas with property-name lists
                let walked = if child.is_object() { self.walk(child, &o, &r)? } else { child.clone() };
                out.insert(name.clone(), walked);
            }
            return Ok(Value::Object(out));
        }
        if SCHEMA_LIST_KEYWORDS.contains(&key) {
            if let Value::Array(children) = value {
                let mut out = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    out.push(self.walk(child, &format!("{original}/{i}"), &format!("{resolved}/{i}"))?);
                }
                return Ok(Value::Array(out));
            }
        }
        if SCHEMA_KEYWORDS.contains(&key) {
            return self.walk(value, &original, &resolved);
        }
        Ok(value.clone())
    }

    fn resolve_ref(
        &mut self,
        map: &Map<String, Value>,
        reference: &str,
        original: &str,
        resolved: &str,
    ) -> Result<Value> {
        let unresolvable = || FormError::UnresolvableRef {
            pointer: resolved.to_string(),
            reference: reference.to_string(),
        };
        let Some(fragment) = reference.strip_prefix('#') else {
            return Err(FormError::ExternalRef { pointer: resolved.to_string(), reference: reference.to_string() });
        };
        let target_keys = pointer::parse(fragment).ok_or_else(unresolvable)?;
        let target = pointer::compile(&target_keys, "");
        if target == original {
            return Err(FormError::InvalidSchema(format!("$ref at {resolved:?} refers to itself")));
        }

        if let Some(frame) = self.stack.iter().rev().find(|f| f.original == target) {
            let target_resolved = frame.resolved.clone();
            debug!(location = resolved, target = %target_resolved, "recursive $ref");
            if target_resolved.is_empty() {
                self.has_root_reference = true;
            }
            self.recursive.insert(resolved.to_string(), target_resolved);
            return Ok(Value::Object(map.clone()));
        }

        let body = pointer::get_keys(self.root, &target_keys).ok_or_else(unresolvable)?;
        self.stack.push(Frame { original: original.to_string(), resolved: resolved.to_string() });
        let mut inlined = self.walk(body, &target, resolved)?;
        if inlined == Value::Bool(true) {
            inlined = Value::Object(Map::new());
        }
        for (key, value) in map.iter().filter(|(k, _)| k.as_str() != "$ref") {
            let sibling = self.walk_keyword(key, value, original, resolved)?;
            if let Value::Object(out) = &mut inlined {
                out.insert(key.clone(), sibling);
            }
        }
        self.stack.pop();

        if inlined.get("items").is_some() && !self.array_schemas.iter().any(|p| p == resolved) {
            self.array_schemas.push(resolved.to_string());
        }
        self.library.insert(resolved.to_string(), inlined.clone());
        Ok(inlined)
    }
}
