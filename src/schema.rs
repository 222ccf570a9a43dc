//! Schema side of the form: draft normalization, `$ref` resolution and the
//! type/widget helpers the builders share.
pub mod draft;
pub mod resolve;
pub mod types;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::pointer::{self, ArrayMap, RecursiveRefMap};

pub use draft::normalize_draft;
pub use resolve::resolve_schema;
pub use types::ControlKind;

/// Schema pointer of a `$ref` location → the sub-schema it stands for.
pub type SchemaRefLibrary = IndexMap<String, Value>;

// Keywords whose values are schemas, grouped by shape.
pub(crate) const SCHEMA_MAP_KEYWORDS: [&str; 3] = ["properties", "patternProperties", "dependencies"];
pub(crate) const SCHEMA_KEYWORDS: [&str; 9] = [
    "items", "additionalItems", "additionalProperties", "not", "if", "then", "else", "contains",
    "propertyNames",
];
pub(crate) const SCHEMA_LIST_KEYWORDS: [&str; 4] = ["items", "allOf", "anyOf", "oneOf"];
pub(crate) const DEFINITION_KEYWORDS: [&str; 2] = ["definitions", "$defs"];

/// Output of one resolution pass. Immutable once built; a re-initialization
/// builds a fresh one.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSchema {
    /// The schema with every non-recursive `$ref` inlined. Recursive ones are
    /// left in place as `{"$ref": ...}` sentinels.
    pub schema: Value,
    pub ref_library: SchemaRefLibrary,
    /// Sentinel schema pointer → schema pointer of the ancestor it re-enters.
    pub schema_recursive_refs: RecursiveRefMap,
    /// Same relation in generic data pointers.
    pub data_recursive_refs: RecursiveRefMap,
    pub array_map: ArrayMap,
    /// Some recursive `$ref` re-enters the root schema.
    pub has_root_reference: bool,
}

impl ResolvedSchema {
    pub fn schema_at(&self, schema_pointer: &str) -> Option<&Value> {
        pointer::get(&self.schema, schema_pointer)
    }

    pub fn is_recursive_ref(&self, schema_pointer: &str) -> bool {
        self.schema_recursive_refs.contains_key(schema_pointer)
    }

    pub fn recursive_target(&self, schema_pointer: &str) -> Option<&str> {
        self.schema_recursive_refs.get(schema_pointer).map(String::as_str)
    }

    /// Pointer a builder should read when it materializes `schema_pointer`:
    /// the recursion target for sentinels, the pointer itself otherwise.
    pub fn expansion_pointer<'a>(&'a self, schema_pointer: &'a str) -> &'a str {
        self.recursive_target(schema_pointer).unwrap_or(schema_pointer)
    }

    /// Canonical schema pointer of a data pointer. Paths through recursive
    /// sentinels land on the ancestor's location.
    pub fn schema_pointer_for(&self, data_pointer: &str) -> Option<String> {
        pointer::to_canonical_schema_pointer(data_pointer, &self.schema, &self.schema_recursive_refs)
    }

    /// Sub-schema a `$ref` location stands for, inlined or recursive.
    pub fn template_schema(&self, schema_pointer: &str) -> Option<&Value> {
        self.ref_library
            .get(schema_pointer)
            .or_else(|| self.schema_at(self.expansion_pointer(schema_pointer)))
    }

    /// Shortest generic form of a data pointer, folding recursion.
    pub fn canonical_data_pointer(&self, data_pointer: &str) -> Option<String> {
        pointer::remove_recursive_references(data_pointer, &self.data_recursive_refs, &self.array_map)
    }

    /// Items an array at `schema_pointer` starts with. Without data, an
    /// array stops short of its first item that recurses: a tuple keeps only
    /// the slots before it, a list of recursive items starts empty. Empty
    /// recursive schemas stay finite that way.
    pub fn initial_item_count(&self, schema_pointer: &str, data: Option<&Value>, list_items: usize) -> usize {
        let Some(schema) = self.schema_at(schema_pointer) else { return 0 };
        let count = types::initial_item_count(schema, data, list_items);
        if data.is_some() {
            return count;
        }
        let first_recursive = (0..count).find(|&index| {
            types::item_schema_keys(schema, index).is_some_and(|(keys, _)| {
                self.is_recursive_ref(&format!("{schema_pointer}{}", pointer::compile(&keys, "")))
            })
        });
        first_recursive.unwrap_or(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recursive_lists_start_empty_without_data() {
        let resolved = resolve_schema(&json!({
            "type": "object",
            "properties": { "kids": { "type": "array", "minItems": 1, "items": { "$ref": "#" } } }
        }))
        .unwrap();
        assert_eq!(resolved.initial_item_count("/properties/kids", None, 2), 0);
        assert_eq!(resolved.initial_item_count("/properties/kids", Some(&json!([{}, {}, {}])), 2), 3);
        assert_eq!(resolved.template_schema("/properties/kids/items"), Some(&resolved.schema));
    }

    #[test]
    fn recursive_tuple_slots_cut_the_initial_count() {
        let resolved = resolve_schema(&json!({
            "type": "object",
            "properties": {
                "pair": { "type": "array", "items": [{ "type": "string" }, { "$ref": "#" }] },
                "lead": { "type": "array", "items": [{ "$ref": "#" }] }
            }
        }))
        .unwrap();
        assert_eq!(resolved.initial_item_count("/properties/pair", None, 0), 1);
        assert_eq!(resolved.initial_item_count("/properties/lead", None, 0), 0);
        assert_eq!(resolved.initial_item_count("/properties/pair", Some(&json!(["a", {}])), 0), 2);
    }

    #[test]
    fn data_pointers_through_definitions_land_on_the_inlined_schema() {
        let resolved = resolve_schema(&json!({
            "definitions": {
                "person": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "children": { "type": "array", "items": { "$ref": "#/definitions/person" } }
                    }
                }
            },
            "type": "object",
            "properties": { "boss": { "$ref": "#/definitions/person" } }
        }))
        .unwrap();
        assert_eq!(
            resolved.schema_pointer_for("/boss/children/0/name").as_deref(),
            Some("/properties/boss/properties/name")
        );
        assert_eq!(
            resolved.schema_pointer_for("/boss/children/-/children/-").as_deref(),
            Some("/properties/boss/properties/children/items")
        );
    }
}
