//! Structural edits. Each one checks every precondition before touching
//! anything, then changes the layout and control trees together; a refused
//! edit leaves both untouched.
use serde_json::Value;
use tracing::{debug, warn};

use super::{FormState, ItemContext, JsonSchemaForm, LiveForm};
use crate::control::{ControlNode, ControlTreeBuilder};
use crate::layout::{ArrayItemType, LayoutBuilder, LayoutNode, WidgetRegistry};
use crate::options::FormOptions;
use crate::pointer::{self, ArrayMap, compile, to_indexed_pointer};
use crate::schema::types::{has_room_for_item, item_schema_keys, max_items, min_items, tuple_len};

impl JsonSchemaForm {
    /// Add an array item or expand a recursive `$ref` placeholder.
    /// `ctx.layout_index` names the placeholder or the array node,
    /// `ctx.data_index` the enclosing array positions. `name` becomes the
    /// new node's title.
    pub fn add_item(&mut self, ctx: &ItemContext, name: Option<&str>) -> bool {
        if !self.options.addable {
            debug!("adding items is disabled");
            return false;
        }
        let FormState::Live(live) = &mut self.state else { return false };
        let added = live.add_item(&self.options, self.widgets.as_ref(), ctx, name);
        if added {
            self.refresh();
        }
        added
    }

    /// Remove the item `ctx` points at. For array items the last
    /// `data_index` entry is the item's own position.
    pub fn remove_item(&mut self, ctx: &ItemContext) -> bool {
        if !self.options.removable {
            debug!("removing items is disabled");
            return false;
        }
        let FormState::Live(live) = &mut self.state else { return false };
        let removed = live.remove_item(&self.options, self.widgets.as_ref(), ctx);
        if removed {
            self.refresh();
        }
        removed
    }

    /// Move a list item of the array node `ctx` points at.
    pub fn move_item(&mut self, ctx: &ItemContext, old_index: usize, new_index: usize) -> bool {
        if !self.options.orderable {
            debug!("reordering items is disabled");
            return false;
        }
        let FormState::Live(live) = &mut self.state else { return false };
        let moved = live.move_item(&self.options, ctx, old_index, new_index);
        if moved {
            self.refresh();
        }
        moved
    }
}

fn indexed_keys(generic: &str, indices: &[usize]) -> Option<Vec<String>> {
    pointer::parse(&to_indexed_pointer(generic, indices, &ArrayMap::new())?)
}

fn set_title(node: &mut LayoutNode, name: Option<&str>) {
    if let Some(name) = name {
        node.options.insert("title".into(), Value::from(name));
    }
}

impl LiveForm {
    fn add_item(
        &mut self,
        options: &FormOptions,
        widgets: &dyn WidgetRegistry,
        ctx: &ItemContext,
        name: Option<&str>,
    ) -> bool {
        let Some(target) = self.layout.node_at(&ctx.layout_index) else {
            warn!(layout_index = ?ctx.layout_index, "no layout node at index");
            return false;
        };
        if target.is_array() {
            return self.add_array_item(options, widgets, ctx, &ctx.layout_index, name);
        }
        if !target.is_placeholder() {
            warn!(layout_index = ?ctx.layout_index, node_type = %target.node_type, "add target is not an array or a $ref placeholder");
            return false;
        }
        let parent = &ctx.layout_index[..ctx.layout_index.len() - 1];
        let in_array = !parent.is_empty() && self.layout.node_at(parent).is_some_and(LayoutNode::is_array);
        if in_array {
            self.add_array_item(options, widgets, ctx, parent, name)
        } else {
            self.add_ref_instance(options, widgets, ctx, name)
        }
    }

    fn add_array_item(
        &mut self,
        options: &FormOptions,
        widgets: &dyn WidgetRegistry,
        ctx: &ItemContext,
        array_path: &[usize],
        name: Option<&str>,
    ) -> bool {
        let Some(array_node) = self.layout.node_at(array_path) else { return false };
        let (Some(array_dp), Some(array_sp)) = (array_node.data_pointer.clone(), array_node.schema_pointer.clone())
        else {
            return false;
        };
        let layout_items = array_node.item_count();
        let Some(schema) = self.resolved.schema_at(&array_sp) else { return false };
        let Some(keys) = indexed_keys(&array_dp, &ctx.data_index) else { return false };
        let Some(ControlNode::Array(array)) = self.controls.get(&keys) else {
            warn!(array = %array_dp, data_index = ?ctx.data_index, "no array control at data pointer");
            return false;
        };
        let index = array.controls.len();
        if layout_items != index {
            warn!(array = %array_dp, layout_items, controls = index, "layout and controls out of step");
            return false;
        }
        if max_items(schema).is_some_and(|max| index >= max) {
            debug!(array = %array_dp, "maxItems reached");
            return false;
        }
        let Some((item_keys, generic_key)) = item_schema_keys(schema, index) else {
            debug!(array = %array_dp, "tuple has no room for more items");
            return false;
        };
        let item_sp = format!("{array_sp}{}", compile(&item_keys, ""));
        let item_dp = format!("{array_dp}/{generic_key}");

        let template = LayoutBuilder::new(
            &self.resolved,
            options,
            widgets,
            &mut self.data_map,
            &mut self.layout.ref_library,
            &mut self.layout.next_id,
        )
        .template(&item_sp, &item_dp);
        let Some(mut template) = template else { return false };
        let control = ControlTreeBuilder::new(&self.resolved, options, &mut self.data_map)
            .build(&item_sp, &item_dp, None, false, true);
        let Some(control) = control else { return false };
        self.layout.renumber(&mut template);
        template.array_item = true;
        set_title(&mut template, name);

        let (Some(ControlNode::Array(array)), Some(array_node)) =
            (self.controls.get_mut(&keys), self.layout.node_at_mut(array_path))
        else {
            return false;
        };
        array.controls.push(control);
        array_node.items.insert(index, template);
        array_node.refresh_removable(options.removable);
        self.sync_add_placeholder(options, widgets, array_path);
        debug!(array = %array_dp, index, "added item");
        true
    }

    /// Keep the array's trailing "Add" node only while it has room.
    fn sync_add_placeholder(&mut self, options: &FormOptions, widgets: &dyn WidgetRegistry, array_path: &[usize]) {
        let Some(array_node) = self.layout.node_at(array_path) else { return };
        let (Some(array_dp), Some(array_sp)) = (array_node.data_pointer.clone(), array_node.schema_pointer.clone())
        else {
            return;
        };
        let Some(schema) = self.resolved.schema_at(&array_sp) else { return };
        let room = options.addable && has_room_for_item(schema, array_node.item_count());
        let present = array_node.items.last().is_some_and(|n| n.is_placeholder() && !n.array_item);
        if room == present {
            return;
        }
        let placeholder = room.then(|| {
            LayoutBuilder::new(
                &self.resolved,
                options,
                widgets,
                &mut self.data_map,
                &mut self.layout.ref_library,
                &mut self.layout.next_id,
            )
            .add_placeholder(&array_sp, &array_dp)
        });
        let Some(array_node) = self.layout.node_at_mut(array_path) else { return };
        match placeholder {
            Some(placeholder) => array_node.items.push(placeholder),
            None => {
                array_node.items.pop();
            }
        }
    }

    fn add_ref_instance(
        &mut self,
        options: &FormOptions,
        widgets: &dyn WidgetRegistry,
        ctx: &ItemContext,
        name: Option<&str>,
    ) -> bool {
        let Some(placeholder) = self.layout.node_at(&ctx.layout_index) else { return false };
        if placeholder.hidden {
            debug!(layout_index = ?ctx.layout_index, "recursive instance already present");
            return false;
        }
        let (Some(dp), Some(sp)) = (placeholder.data_pointer.clone(), placeholder.schema_pointer.clone()) else {
            return false;
        };
        let Some(keys) = indexed_keys(&dp, &ctx.data_index) else { return false };
        let Some((key, parent_keys)) = keys.split_last() else { return false };
        match self.controls.get(parent_keys) {
            Some(ControlNode::Group(group)) if !group.controls.contains_key(key) => {}
            _ => {
                debug!(data_pointer = %dp, "no free group slot for recursive instance");
                return false;
            }
        }

        let template = LayoutBuilder::new(
            &self.resolved,
            options,
            widgets,
            &mut self.data_map,
            &mut self.layout.ref_library,
            &mut self.layout.next_id,
        )
        .template(&sp, &dp);
        let Some(mut template) = template else { return false };
        let required = template.options.get("required") == Some(&Value::Bool(true));
        let control = ControlTreeBuilder::new(&self.resolved, options, &mut self.data_map)
            .build(&sp, &dp, None, required, true);
        let Some(control) = control else { return false };
        self.layout.renumber(&mut template);
        set_title(&mut template, name);

        let position = ctx.layout_index[ctx.layout_index.len() - 1];
        let (Some(ControlNode::Group(group)), Some(siblings)) =
            (self.controls.get_mut(parent_keys), self.layout.siblings_mut(&ctx.layout_index))
        else {
            return false;
        };
        siblings.insert(position, template);
        siblings[position + 1].hidden = true;
        group.controls.insert(key.clone(), control);
        debug!(data_pointer = %dp, "added recursive instance");
        true
    }

    fn remove_item(&mut self, options: &FormOptions, widgets: &dyn WidgetRegistry, ctx: &ItemContext) -> bool {
        let Some((&position, parent_path)) = ctx.layout_index.split_last() else { return false };
        let Some(target) = self.layout.node_at(&ctx.layout_index) else {
            warn!(layout_index = ?ctx.layout_index, "no layout node at index");
            return false;
        };
        let in_array = !parent_path.is_empty() && self.layout.node_at(parent_path).is_some_and(LayoutNode::is_array);
        if in_array && target.array_item {
            self.remove_array_item(options, widgets, ctx, parent_path, position)
        } else if target.recursive_reference && !target.is_placeholder() {
            self.remove_ref_instance(ctx, position)
        } else {
            warn!(layout_index = ?ctx.layout_index, "remove target is not an array item or a recursive instance");
            false
        }
    }

    fn remove_array_item(
        &mut self,
        options: &FormOptions,
        widgets: &dyn WidgetRegistry,
        ctx: &ItemContext,
        array_path: &[usize],
        position: usize,
    ) -> bool {
        let Some(array_node) = self.layout.node_at(array_path) else { return false };
        let Some(array_dp) = array_node.data_pointer.clone() else { return false };
        let kind = array_node.array_item_type;
        let schema = array_node.schema_pointer.as_deref().and_then(|sp| self.resolved.schema_at(sp));
        let (min, tuple) = schema.map_or((0, 0), |s| (min_items(s), tuple_len(s)));

        let Some((&index, enclosing)) = ctx.data_index.split_last() else {
            warn!(array = %array_dp, "remove needs the item's own data index");
            return false;
        };
        if index != position {
            warn!(array = %array_dp, index, position, "layout position and data index disagree");
            return false;
        }
        let Some(keys) = indexed_keys(&array_dp, enclosing) else { return false };
        let Some(ControlNode::Array(array)) = self.controls.get(&keys) else { return false };
        let len = array.controls.len();
        if index >= len {
            return false;
        }
        if len <= min {
            debug!(array = %array_dp, min, "minItems reached");
            return false;
        }
        let allowed = match kind {
            Some(ArrayItemType::Tuple) => index + 1 == len,
            _ => index >= tuple,
        };
        if !allowed {
            debug!(array = %array_dp, index, "only the trailing tuple item can be removed");
            return false;
        }

        let (Some(ControlNode::Array(array)), Some(array_node)) =
            (self.controls.get_mut(&keys), self.layout.node_at_mut(array_path))
        else {
            return false;
        };
        array.controls.remove(index);
        array_node.items.remove(position);
        array_node.refresh_removable(options.removable);
        self.sync_add_placeholder(options, widgets, array_path);
        debug!(array = %array_dp, index, "removed item");
        true
    }

    fn remove_ref_instance(&mut self, ctx: &ItemContext, position: usize) -> bool {
        let Some(node) = self.layout.node_at(&ctx.layout_index) else { return false };
        let Some(dp) = node.data_pointer.clone() else { return false };
        let Some(keys) = indexed_keys(&dp, &ctx.data_index) else { return false };
        let Some((key, parent_keys)) = keys.split_last() else { return false };

        let (Some(ControlNode::Group(group)), Some(siblings)) =
            (self.controls.get_mut(parent_keys), self.layout.siblings_mut(&ctx.layout_index))
        else {
            return false;
        };
        let restores = siblings
            .get(position + 1)
            .is_some_and(|n| n.is_placeholder() && n.hidden && n.data_pointer.as_deref() == Some(dp.as_str()));
        if !restores || !group.controls.contains_key(key) {
            warn!(data_pointer = %dp, "recursive instance has no hidden placeholder to restore");
            return false;
        }
        siblings.remove(position);
        siblings[position].hidden = false;
        group.controls.shift_remove(key);
        debug!(data_pointer = %dp, "removed recursive instance");
        true
    }

    fn move_item(&mut self, options: &FormOptions, ctx: &ItemContext, old_index: usize, new_index: usize) -> bool {
        let Some(array_node) = self.layout.node_at(&ctx.layout_index) else { return false };
        if !array_node.is_array() {
            warn!(layout_index = ?ctx.layout_index, "move target is not an array");
            return false;
        }
        let Some(array_dp) = array_node.data_pointer.clone() else { return false };
        let tuple = array_node.options.get("tupleItems").and_then(Value::as_u64).unwrap_or(0) as usize;
        let Some(keys) = indexed_keys(&array_dp, &ctx.data_index) else { return false };
        let len = self.controls.get(&keys).map_or(0, ControlNode::len);
        let in_list = |i: usize| i >= tuple && i < len;
        if !in_list(old_index) || !in_list(new_index) {
            debug!(array = %array_dp, old_index, new_index, "only list positions can move");
            return false;
        }

        let (Some(control), Some(array_node)) = (self.controls.get_mut(&keys), self.layout.node_at_mut(&ctx.layout_index))
        else {
            return false;
        };
        if !control.move_child(old_index, new_index) {
            return false;
        }
        let moved = array_node.items.remove(old_index);
        array_node.items.insert(new_index, moved);
        array_node.refresh_removable(options.removable);
        debug!(array = %array_dp, old_index, new_index, "moved item");
        true
    }
}
