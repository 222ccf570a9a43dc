//! Resolved schema + data → control tree, recording every created control
//! in the [`DataMap`].
//!
//! Item counts come from [`ResolvedSchema::initial_item_count`], the same
//! helper the layout builder uses, so both trees have the same shape.
use serde_json::Value;
use tracing::warn;

use super::{ControlNode, GroupControl};
use crate::data_map::DataMap;
use crate::options::FormOptions;
use crate::pointer::{compile, escape};
use crate::schema::ResolvedSchema;
use crate::schema::types::{
    ControlKind, container_seed, control_kind, is_required, item_schema_keys, primary_type, zero_value,
};

pub struct ControlTreeBuilder<'a> {
    resolved: &'a ResolvedSchema,
    options: &'a FormOptions,
    data_map: &'a mut DataMap,
}

impl<'a> ControlTreeBuilder<'a> {
    pub fn new(resolved: &'a ResolvedSchema, options: &'a FormOptions, data_map: &'a mut DataMap) -> Self {
        Self { resolved, options, data_map }
    }

    pub fn build_root(&mut self, data: Option<&Value>) -> ControlNode {
        self.build("", "", data, false, true)
            .unwrap_or_else(|| ControlNode::Group(GroupControl::default()))
    }

    /// Control for the schema at `schema_pointer` bound to the generic
    /// `data_pointer`. A recursive location yields `None` unless it has data
    /// or `materialize` asks for one level regardless.
    pub fn build(
        &mut self,
        schema_pointer: &str,
        data_pointer: &str,
        data: Option<&Value>,
        required: bool,
        materialize: bool,
    ) -> Option<ControlNode> {
        let resolved = self.resolved;
        if resolved.is_recursive_ref(schema_pointer) && !materialize && data.is_none() {
            return None;
        }
        let expand = resolved.expansion_pointer(schema_pointer);
        let Some(schema) = resolved.schema_at(expand) else {
            warn!(schema_pointer, "no schema at pointer");
            return Some(ControlNode::leaf(data.cloned().unwrap_or(Value::Null)));
        };
        let kind = control_kind(schema);
        self.record(data_pointer, expand, schema, kind, required);

        let seeded = container_seed(schema, data, self.options.set_schema_defaults);
        Some(match kind {
            ControlKind::Group => self.group(expand, schema, data_pointer, seeded),
            ControlKind::Array => self.array(expand, schema, data_pointer, seeded),
            ControlKind::Leaf => ControlNode::leaf(self.seed(data_pointer, schema, data)),
        })
    }

    fn record(&mut self, data_pointer: &str, schema_pointer: &str, schema: &Value, kind: ControlKind, required: bool) {
        let canonical = self
            .resolved
            .canonical_data_pointer(data_pointer)
            .unwrap_or_else(|| data_pointer.to_string());
        let entry = self.data_map.entry_mut(&canonical);
        entry.schema_pointer.get_or_insert_with(|| schema_pointer.to_string());
        entry.control_pointer.get_or_insert_with(|| data_pointer.to_string());
        entry.data_type = primary_type(schema).map(str::to_string);
        entry.kind = Some(kind);
        entry.required |= required;
    }

    /// Leaf value: data, then layout default, then schema default, then the
    /// type's zero value.
    fn seed(&self, data_pointer: &str, schema: &Value, data: Option<&Value>) -> Value {
        if let Some(value) = data {
            return value.clone();
        }
        if self.options.set_layout_defaults {
            let layout_default = self
                .data_map
                .lookup(data_pointer, self.resolved)
                .and_then(|entry| entry.layout_default.clone());
            if let Some(value) = layout_default {
                return value;
            }
        }
        if self.options.set_schema_defaults {
            if let Some(value) = schema.get("default") {
                return value.clone();
            }
        }
        zero_value(schema)
    }

    fn group(&mut self, schema_pointer: &str, schema: &Value, data_pointer: &str, data: Option<&Value>) -> ControlNode {
        let mut group = GroupControl::default();
        if let Some(Value::Object(props)) = schema.get("properties") {
            for name in props.keys() {
                let key = escape(name);
                let child_data = data.and_then(|d| d.get(name)).filter(|v| !v.is_null());
                let child = self.build(
                    &format!("{schema_pointer}/properties/{key}"),
                    &format!("{data_pointer}/{key}"),
                    child_data,
                    is_required(schema, name),
                    false,
                );
                if let Some(child) = child {
                    group.controls.insert(name.clone(), child);
                }
            }
        }
        ControlNode::Group(group)
    }

    fn array(&mut self, schema_pointer: &str, schema: &Value, data_pointer: &str, data: Option<&Value>) -> ControlNode {
        let count = self.resolved.initial_item_count(schema_pointer, data, self.options.list_items);
        let mut controls = Vec::with_capacity(count);
        for index in 0..count {
            let Some((keys, generic_key)) = item_schema_keys(schema, index) else { break };
            let item = self.build(
                &format!("{schema_pointer}{}", compile(&keys, "")),
                &format!("{data_pointer}/{generic_key}"),
                data.and_then(|d| d.get(index)),
                false,
                true,
            );
            controls.extend(item);
        }
        ControlNode::Array(super::ArrayControl { controls, ..Default::default() })
    }
}
