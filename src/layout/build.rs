//! Schema (+ optional explicit layout) → layout tree.
//!
//! Without an explicit layout the tree is synthesized from the schema. With
//! one, each `key` is located in the schema through its data pointer and the
//! layout entry is overlaid on the synthesized node; `"*"` splices in the
//! whole synthesized layout at that point.
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::node::{self, ArrayItemType, LayoutNode, LayoutRefLibrary};
use super::widget::WidgetRegistry;
use crate::data_map::DataMap;
use crate::error::{FormError, Result};
use crate::options::FormOptions;
use crate::pointer::{self, compile, escape, is_array_key, parse_object_path};
use crate::schema::ResolvedSchema;
use crate::schema::types::{
    ControlKind, container_seed, control_kind, fix_title, has_room_for_item, input_type, is_required,
    is_tuple, item_schema_keys, primary_type, tuple_len,
};

/// Schema keywords copied onto a node's options.
const SCHEMA_OPTIONS: [&str; 17] = [
    "title", "description", "default", "enum", "minimum", "maximum", "exclusiveMinimum",
    "exclusiveMaximum", "multipleOf", "minLength", "maxLength", "pattern", "format", "readOnly",
    "minItems", "maxItems", "uniqueItems",
];

pub struct LayoutBuilder<'a> {
    resolved: &'a ResolvedSchema,
    options: &'a FormOptions,
    widgets: &'a dyn WidgetRegistry,
    data_map: &'a mut DataMap,
    templates: &'a mut LayoutRefLibrary,
    next_id: &'a mut u64,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(
        resolved: &'a ResolvedSchema,
        options: &'a FormOptions,
        widgets: &'a dyn WidgetRegistry,
        data_map: &'a mut DataMap,
        templates: &'a mut LayoutRefLibrary,
        next_id: &'a mut u64,
    ) -> Self {
        Self { resolved, options, widgets, data_map, templates, next_id }
    }

    /// Top-level layout nodes. `layout` must be a JSON array when given.
    pub fn build(&mut self, layout: Option<&Value>, data: Option<&Value>) -> Result<Vec<LayoutNode>> {
        let mut nodes = match layout {
            None => self.synthesize(data),
            Some(Value::Array(items)) => self.explicit(items, data)?,
            Some(other) => {
                return Err(FormError::InvalidLayout(format!("expected an array of layout items, got {other}")));
            }
        };
        if self.options.add_submit && !has_submit(&nodes) {
            let mut submit = LayoutNode { id: self.fresh_id(), node_type: "submit".into(), ..Default::default() };
            submit.options.insert("title".into(), Value::from("Submit"));
            self.attach_widget(&mut submit);
            nodes.push(submit);
        }
        debug!(nodes = nodes.len(), templates = self.templates.len(), "built layout");
        Ok(nodes)
    }

    /// Template for one new item at `item_dp`, built on first use and cached.
    pub fn template(&mut self, item_sp: &str, item_dp: &str) -> Option<LayoutNode> {
        if let Some(cached) = self.templates.get(item_dp) {
            return Some(cached.clone());
        }
        let resolved = self.resolved;
        if resolved.schema_at(resolved.expansion_pointer(item_sp)).is_none() {
            warn!(schema_pointer = item_sp, "no schema for item template");
            return None;
        }
        let name = pointer::to_key(item_dp).filter(|k| !is_array_key(k));
        let required = self.property_required(item_sp);
        let template = self.schema_node(item_sp, item_dp, name.as_deref(), required, None, true);
        self.templates.insert(item_dp.to_string(), template.clone());
        Some(template)
    }

    fn fresh_id(&mut self) -> String {
        node::next_id(self.next_id)
    }

    fn attach_widget(&self, node: &mut LayoutNode) {
        node.widget = self.widgets.resolve(&node.node_type, &node.options);
        if node.widget.is_none() {
            warn!(tag = %node.node_type, "no widget registered for layout type");
        }
    }

    fn synthesize(&mut self, data: Option<&Value>) -> Vec<LayoutNode> {
        let root = self.schema_node("", "", None, false, data, true);
        let is_group = self.resolved.schema_at("").map(control_kind) == Some(ControlKind::Group);
        if is_group { root.items } else { vec![root] }
    }

    fn schema_node(
        &mut self,
        schema_pointer: &str,
        data_pointer: &str,
        name: Option<&str>,
        required: bool,
        data: Option<&Value>,
        materialize: bool,
    ) -> LayoutNode {
        let resolved = self.resolved;
        let recursive = resolved.is_recursive_ref(schema_pointer);
        if recursive && !materialize && data.is_none() {
            return self.placeholder(schema_pointer, data_pointer, name, true);
        }
        let expand = resolved.expansion_pointer(schema_pointer).to_string();
        let Some(schema) = resolved.schema_at(&expand) else {
            warn!(schema_pointer, "no schema at pointer");
            let mut node = LayoutNode {
                id: self.fresh_id(),
                node_type: "none".into(),
                data_pointer: Some(data_pointer.to_string()),
                ..Default::default()
            };
            self.attach_widget(&mut node);
            return node;
        };

        let kind = control_kind(schema);
        let mut node = LayoutNode {
            id: self.fresh_id(),
            node_type: input_type(schema),
            name: name.map(str::to_string),
            data_pointer: Some(data_pointer.to_string()),
            schema_pointer: Some(expand.clone()),
            data_type: primary_type(schema).map(str::to_string),
            options: schema_options(schema, name, required),
            recursive_reference: recursive,
            ..Default::default()
        };
        let seeded = container_seed(schema, data, self.options.set_schema_defaults);
        match kind {
            ControlKind::Group => self.group_items(&mut node, &expand, schema, data_pointer, seeded),
            ControlKind::Array => self.array_items(&mut node, &expand, schema, data_pointer, seeded),
            ControlKind::Leaf => {}
        }
        self.attach_widget(&mut node);
        node
    }

    fn group_items(
        &mut self,
        node: &mut LayoutNode,
        schema_pointer: &str,
        schema: &Value,
        data_pointer: &str,
        data: Option<&Value>,
    ) {
        let Some(Value::Object(props)) = schema.get("properties") else { return };
        for name in props.keys() {
            let key = escape(name);
            let child_sp = format!("{schema_pointer}/properties/{key}");
            let child_dp = format!("{data_pointer}/{key}");
            let child_data = data.and_then(|d| d.get(name)).filter(|v| !v.is_null());
            let child = self.schema_node(&child_sp, &child_dp, Some(name), is_required(schema, name), child_data, false);
            let expanded_ref = child.recursive_reference && !child.is_placeholder();
            node.items.push(child);
            // kept hidden so removing the expansion can bring it back
            if expanded_ref {
                let mut placeholder = self.placeholder(&child_sp, &child_dp, Some(name), true);
                placeholder.hidden = true;
                node.items.push(placeholder);
            }
        }
    }

    fn array_items(
        &mut self,
        node: &mut LayoutNode,
        schema_pointer: &str,
        schema: &Value,
        data_pointer: &str,
        data: Option<&Value>,
    ) {
        let resolved = self.resolved;
        let tuple = tuple_len(schema);
        node.array_item_type = Some(if is_tuple(schema) { ArrayItemType::Tuple } else { ArrayItemType::List });
        if tuple > 0 {
            node.options.insert("tupleItems".into(), Value::from(tuple));
        }

        // Recursive item templates wait for the first add.
        for index in 0..=tuple {
            let Some((keys, generic_key)) = item_schema_keys(schema, index) else { continue };
            let item_sp = format!("{schema_pointer}{}", compile(&keys, ""));
            if !resolved.is_recursive_ref(&item_sp) {
                self.template(&item_sp, &format!("{data_pointer}/{generic_key}"));
            }
        }

        let count = resolved.initial_item_count(schema_pointer, data, self.options.list_items);
        for index in 0..count {
            let Some((keys, generic_key)) = item_schema_keys(schema, index) else {
                warn!(data_pointer, index, "array holds more items than its schema allows");
                break;
            };
            let item_sp = format!("{schema_pointer}{}", compile(&keys, ""));
            let item_dp = format!("{data_pointer}/{generic_key}");
            let item_data = data.and_then(|d| d.get(index));
            let mut item = self.schema_node(&item_sp, &item_dp, None, false, item_data, true);
            item.array_item = true;
            node.items.push(item);
        }

        if self.options.addable && has_room_for_item(schema, node.item_count()) {
            node.items.push(self.add_placeholder(schema_pointer, data_pointer));
        }
        node.refresh_removable(self.options.removable);
    }

    /// Trailing "Add" node of the array at `array_sp` / `array_dp`.
    pub fn add_placeholder(&mut self, array_sp: &str, array_dp: &str) -> LayoutNode {
        self.placeholder(array_sp, &format!("{array_dp}/-"), None, false)
    }

    /// `$ref` node standing for something "add" can create.
    fn placeholder(&mut self, schema_pointer: &str, data_pointer: &str, name: Option<&str>, recursive: bool) -> LayoutNode {
        let resolved = self.resolved;
        let label = resolved
            .template_schema(schema_pointer)
            .and_then(|s| s.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| name.map(fix_title))
            .unwrap_or_else(|| "item".to_string());
        let mut node = LayoutNode {
            id: self.fresh_id(),
            node_type: "$ref".into(),
            name: name.map(str::to_string),
            data_pointer: Some(data_pointer.to_string()),
            schema_pointer: Some(schema_pointer.to_string()),
            ref_pointer: Some(data_pointer.to_string()),
            recursive_reference: recursive,
            ..Default::default()
        };
        node.options.insert("title".into(), Value::from(format!("Add {label}")));
        self.attach_widget(&mut node);
        node
    }

    fn property_required(&self, schema_pointer: &str) -> bool {
        let Some(keys) = pointer::parse(schema_pointer) else { return false };
        let n = keys.len();
        if n < 2 || keys[n - 2] != "properties" {
            return false;
        }
        let parent = compile(&keys[..n - 2], "");
        self.resolved.schema_at(&parent).is_some_and(|p| is_required(p, &keys[n - 1]))
    }

    // ------------------------------ Explicit ------------------------------ //

    fn explicit(&mut self, items: &[Value], data: Option<&Value>) -> Result<Vec<LayoutNode>> {
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) if s == "*" => nodes.extend(self.synthesize(data)),
                Value::String(key) => nodes.push(self.keyed(key, &Map::new(), data)?),
                Value::Object(spec) => match spec.get("key").and_then(Value::as_str) {
                    Some(key) => nodes.push(self.keyed(key, spec, data)?),
                    None => nodes.push(self.container(spec, data)?),
                },
                other => {
                    return Err(FormError::InvalidLayout(format!("layout items must be strings or objects, got {other}")));
                }
            }
        }
        Ok(nodes)
    }

    fn keyed(&mut self, key: &str, spec: &Map<String, Value>, data: Option<&Value>) -> Result<LayoutNode> {
        let keys = parse_object_path(key);
        let data_pointer = compile(&keys, "");
        let name = keys.last().filter(|k| !is_array_key(k)).cloned();
        let resolved = self.resolved;
        let mut node = match resolved.schema_pointer_for(&data_pointer) {
            Some(schema_pointer) => {
                let item_data = if keys.iter().any(|k| k == "-") {
                    None
                } else {
                    data.and_then(|d| pointer::get_keys(d, &keys))
                };
                let required = self.key_required(&keys);
                self.schema_node(&schema_pointer, &data_pointer, name.as_deref(), required, item_data, true)
            }
            None => {
                warn!(key, "layout key has no schema counterpart");
                LayoutNode {
                    id: self.fresh_id(),
                    node_type: "text".into(),
                    name,
                    data_pointer: Some(data_pointer),
                    ..Default::default()
                }
            }
        };
        self.overlay(&mut node, spec, data)?;
        Ok(node)
    }

    fn key_required(&self, keys: &[String]) -> bool {
        let Some((last, parent)) = keys.split_last() else { return false };
        let resolved = self.resolved;
        resolved
            .schema_pointer_for(&compile(parent, ""))
            .and_then(|sp| resolved.schema_at(resolved.expansion_pointer(&sp)))
            .is_some_and(|p| is_required(p, last))
    }

    fn container(&mut self, spec: &Map<String, Value>, data: Option<&Value>) -> Result<LayoutNode> {
        let node_type = spec.get("type").and_then(Value::as_str).unwrap_or("section");
        let mut node = LayoutNode { id: self.fresh_id(), node_type: node_type.to_string(), ..Default::default() };
        for (key, value) in spec.iter().filter(|(k, _)| !matches!(k.as_str(), "type" | "items")) {
            node.options.insert(key.clone(), value.clone());
        }
        match spec.get("items") {
            Some(Value::Array(children)) => node.items = self.explicit(children, data)?,
            Some(other) => return Err(FormError::InvalidLayout(format!("container items must be an array, got {other}"))),
            None => {}
        }
        self.attach_widget(&mut node);
        Ok(node)
    }

    fn overlay(&mut self, node: &mut LayoutNode, spec: &Map<String, Value>, data: Option<&Value>) -> Result<()> {
        let canonical = node
            .data_pointer
            .as_deref()
            .map(|dp| self.resolved.canonical_data_pointer(dp).unwrap_or_else(|| dp.to_string()));
        for (key, value) in spec {
            match key.as_str() {
                "key" | "items" => continue,
                "type" => {
                    if let Some(t) = value.as_str() {
                        node.node_type = t.to_string();
                    }
                    continue;
                }
                "copyValueTo" => {
                    if let Some(c) = &canonical {
                        self.data_map.entry_mut(c).copy_value_to = copy_targets(value);
                    }
                }
                "default" => {
                    if let Some(c) = &canonical {
                        self.data_map.entry_mut(c).layout_default = Some(value.clone());
                    }
                }
                _ => {}
            }
            node.options.insert(key.clone(), value.clone());
        }
        match spec.get("items") {
            Some(Value::Array(children)) if node.is_array() => self.explicit_item_template(node, children)?,
            Some(Value::Array(children)) => node.items = self.explicit(children, data)?,
            Some(other) => return Err(FormError::InvalidLayout(format!("items must be an array, got {other}"))),
            None => {}
        }
        self.attach_widget(node);
        Ok(())
    }

    /// Explicit `items` on an array describe one list item; every existing
    /// list item is rebuilt from that template.
    fn explicit_item_template(&mut self, node: &mut LayoutNode, children: &[Value]) -> Result<()> {
        let item_dp = format!("{}/-", node.data_pointer.as_deref().unwrap_or_default());
        let mut template = LayoutNode {
            id: self.fresh_id(),
            node_type: "section".into(),
            data_pointer: Some(item_dp.clone()),
            items: self.explicit(children, None)?,
            array_item: true,
            ..Default::default()
        };
        self.attach_widget(&mut template);
        self.templates.insert(item_dp, template.clone());

        let tuple = node.options.get("tupleItems").and_then(Value::as_u64).unwrap_or(0) as usize;
        let mut position = 0;
        for item in node.items.iter_mut().filter(|n| n.array_item) {
            if position >= tuple {
                let mut fresh = template.clone();
                node::renumber(&mut fresh, self.next_id);
                *item = fresh;
            }
            position += 1;
        }
        node.refresh_removable(self.options.removable);
        Ok(())
    }
}

/// `copyValueTo` targets as generic pointers; dotted keys are accepted.
fn copy_targets(value: &Value) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .filter_map(|t| if t.starts_with('/') { pointer::normalize(t) } else { Some(compile(&parse_object_path(t), "")) })
        .collect()
}

fn schema_options(schema: &Value, name: Option<&str>, required: bool) -> Map<String, Value> {
    let mut options = Map::new();
    for key in SCHEMA_OPTIONS {
        if let Some(value) = schema.get(key) {
            options.insert(key.to_string(), value.clone());
        }
    }
    if !options.contains_key("title") {
        if let Some(name) = name {
            options.insert("title".into(), Value::from(fix_title(name)));
        }
    }
    if required {
        options.insert("required".into(), Value::Bool(true));
    }
    if let Some(Value::Object(extra)) = schema.get("x-schema-form") {
        for (key, value) in extra {
            options.insert(key.clone(), value.clone());
        }
    }
    options
}

fn has_submit(nodes: &[LayoutNode]) -> bool {
    let mut found = false;
    for node in nodes {
        node.walk(&mut |n| found |= n.node_type == "submit");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::widget::WidgetLibrary;
    use crate::schema::resolve_schema;
    use serde_json::json;

    struct Built {
        nodes: Vec<LayoutNode>,
        templates: LayoutRefLibrary,
        data_map: DataMap,
    }

    fn build(schema: Value, layout: Option<Value>, data: Option<Value>, options: FormOptions) -> Built {
        let resolved = resolve_schema(&schema).unwrap();
        let widgets = WidgetLibrary::default();
        let mut data_map = DataMap::new();
        let mut templates = LayoutRefLibrary::new();
        let mut next_id = 0;
        let nodes = LayoutBuilder::new(&resolved, &options, &widgets, &mut data_map, &mut templates, &mut next_id)
            .build(layout.as_ref(), data.as_ref())
            .unwrap();
        Built { nodes, templates, data_map }
    }

    fn contact() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string", "format": "email", "title": "E-mail" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "row": { "type": "array", "items": [{ "type": "string" }, { "type": "number" }] }
            }
        })
    }

    #[test]
    fn synthesized_layout_follows_schema() {
        let b = build(contact(), None, Some(json!({ "tags": ["a", "b"] })), FormOptions::default());
        let types: Vec<&str> = b.nodes.iter().map(|n| n.node_type.as_str()).collect();
        assert_eq!(types, vec!["text", "email", "array", "array"]);
        assert_eq!(b.nodes[0].options["title"], json!("Name"));
        assert_eq!(b.nodes[0].options["required"], json!(true));
        assert_eq!(b.nodes[1].options["title"], json!("E-mail"));
        assert_eq!(b.nodes[0].widget.as_ref().map(|w| w.component.as_str()), Some("text"));

        let tags = &b.nodes[2];
        assert_eq!(tags.array_item_type, Some(ArrayItemType::List));
        assert_eq!(tags.item_count(), 2);
        assert!(tags.items.last().is_some_and(LayoutNode::is_placeholder));
        assert_eq!(tags.items[0].data_pointer.as_deref(), Some("/tags/-"));

        let row = &b.nodes[3];
        assert_eq!(row.array_item_type, Some(ArrayItemType::Tuple));
        assert_eq!(row.item_count(), 2);
        assert_eq!(row.items[1].data_pointer.as_deref(), Some("/row/1"));
        assert!(!row.items[0].removable && row.items[1].removable);

        assert!(b.templates.contains_key("/tags/-"));
        assert!(b.templates.contains_key("/row/0"));
        assert!(b.templates.contains_key("/row/1"));
    }

    #[test]
    fn explicit_layout_overlays_and_expands_star() {
        let layout = json!([
            { "key": "name", "title": "Full name", "default": "anon", "copyValueTo": ["email"] },
            { "type": "fieldset", "title": "More", "items": ["*"] }
        ]);
        let b = build(contact(), Some(layout), None, FormOptions { add_submit: true, ..Default::default() });
        assert_eq!(b.nodes.len(), 3);
        assert_eq!(b.nodes[0].options["title"], json!("Full name"));
        assert_eq!(b.nodes[1].node_type, "fieldset");
        assert_eq!(b.nodes[1].items.len(), 4);
        assert_eq!(b.nodes[2].node_type, "submit");
        let entry = b.data_map.get("/name").unwrap();
        assert_eq!(entry.layout_default, Some(json!("anon")));
        assert_eq!(entry.copy_value_to, vec!["/email".to_string()]);
    }

    #[test]
    fn unknown_keys_and_bad_layouts() {
        let b = build(contact(), Some(json!(["nope"])), None, FormOptions::default());
        assert_eq!(b.nodes[0].node_type, "text");
        assert!(b.nodes[0].schema_pointer.is_none());

        let resolved = resolve_schema(&contact()).unwrap();
        let widgets = WidgetLibrary::default();
        let (mut dm, mut lib, mut id) = (DataMap::new(), LayoutRefLibrary::new(), 0);
        let options = FormOptions::default();
        let mut builder = LayoutBuilder::new(&resolved, &options, &widgets, &mut dm, &mut lib, &mut id);
        assert!(matches!(builder.build(Some(&json!({ "key": "name" })), None), Err(FormError::InvalidLayout(_))));
        assert!(matches!(builder.build(Some(&json!([42])), None), Err(FormError::InvalidLayout(_))));
    }

    #[test]
    fn recursive_nodes_become_placeholders() {
        let schema = json!({
            "definitions": {
                "person": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "spouse": { "$ref": "#/definitions/person" },
                        "children": { "type": "array", "items": { "$ref": "#/definitions/person" } }
                    }
                }
            },
            "type": "object",
            "properties": { "boss": { "$ref": "#/definitions/person" } }
        });
        let data = json!({ "boss": { "name": "a", "spouse": { "name": "b" }, "children": [{ "name": "c" }] } });
        let b = build(schema, None, Some(data), FormOptions::default());
        let boss = &b.nodes[0];
        let types: Vec<&str> = boss.items.iter().map(|n| n.node_type.as_str()).collect();
        // name, expanded spouse, its hidden placeholder, children
        assert_eq!(types, vec!["text", "section", "$ref", "array"]);
        assert!(boss.items[2].hidden);

        let spouse = &boss.items[1];
        assert!(spouse.recursive_reference);
        let spouse_types: Vec<&str> = spouse.items.iter().map(|n| n.node_type.as_str()).collect();
        assert_eq!(spouse_types, vec!["text", "$ref", "array"]);
        assert_eq!(spouse.items[1].ref_pointer.as_deref(), Some("/boss/spouse/spouse"));

        let children = &boss.items[3];
        assert_eq!(children.item_count(), 1);
        assert_eq!(children.items[0].data_pointer.as_deref(), Some("/boss/children/-"));
        assert!(!b.templates.contains_key("/boss/children/-"));
    }
}
