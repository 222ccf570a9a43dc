//! One form instance: inputs, collaborators and the live trees.
//!
//! Lifecycle is `Uninitialized → Live → Uninitialized`. [`JsonSchemaForm::initialize`]
//! resolves the schema, builds layout and control trees and compiles the
//! validator in one pass; if any step fails the form stays uninitialized.
//! Every successful mutation reformats the data, revalidates and notifies
//! listeners before returning.
pub mod format;
pub mod items;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::control::{ControlNode, ControlTreeBuilder};
use crate::data_map::DataMap;
use crate::error::Result;
use crate::layout::{Layout, LayoutBuilder, WidgetLibrary, WidgetRegistry};
use crate::options::FormOptions;
use crate::pointer::{self, ArrayMap, index_array, to_generic_pointer, to_indexed_pointer};
use crate::schema::{ResolvedSchema, normalize_draft, resolve_schema};
use crate::validate::{CompiledValidator, JsonSchemaValidator, ValidationIssue, ValidationReport, Validator};

/// Where an item operation applies: `layout_index` walks
/// `layout[..].items[..]`, `data_index` fills the `-` positions of the
/// target's generic data pointer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemContext {
    pub data_index: Vec<usize>,
    pub layout_index: Vec<usize>,
}

impl ItemContext {
    pub fn new(data_index: impl Into<Vec<usize>>, layout_index: impl Into<Vec<usize>>) -> Self {
        Self { data_index: data_index.into(), layout_index: layout_index.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormEvent {
    Initialized,
    /// Formatted data after a mutation.
    DataChanged(Value),
    ValidationChanged(ValidationReport),
    Reset,
}

type Listener = Box<dyn FnMut(&FormEvent)>;

pub enum FormState {
    Uninitialized,
    Live(Box<LiveForm>),
}

/// The four trees of an initialized form plus the compiled validator.
pub struct LiveForm {
    pub(crate) resolved: ResolvedSchema,
    pub(crate) layout: Layout,
    pub(crate) controls: ControlNode,
    pub(crate) data_map: DataMap,
    compiled: Box<dyn CompiledValidator>,
    pub(crate) data: Value,
    pub(crate) report: ValidationReport,
}

impl LiveForm {
    fn reformat(&mut self, return_empty_fields: bool) {
        self.data = format::format_data(&self.controls.value(), &self.resolved, &self.data_map, return_empty_fields);
    }

    /// Validate `data`, move errors onto controls. True when the report
    /// changed.
    fn validate(&mut self) -> bool {
        let report = self.compiled.validate(&self.data);
        self.controls.clear_errors();
        for issue in &report.errors {
            let keys = pointer::parse(&issue.pointer).unwrap_or_default();
            self.controls.attach_error(&keys, &issue.message);
        }
        let changed = report != self.report;
        self.report = report;
        changed
    }

    fn write_value(&mut self, data_pointer: &str, value: Value) -> bool {
        let Some(keys) = pointer::parse(data_pointer) else { return false };
        let Some(control) = self.controls.get_mut(&keys) else {
            warn!(data_pointer, "no control at data pointer");
            return false;
        };
        control.patch_value(&value);

        let Some(generic) = to_generic_pointer(data_pointer, &self.resolved.array_map) else { return true };
        let targets = self
            .data_map
            .lookup(&generic, &self.resolved)
            .map(|entry| entry.copy_value_to.clone())
            .unwrap_or_default();
        let indices = index_array(data_pointer, &generic).unwrap_or_default();
        for target in targets {
            let control = to_indexed_pointer(&target, &indices, &ArrayMap::new())
                .and_then(|p| pointer::parse(&p))
                .and_then(|k| self.controls.get_mut(&k));
            match control {
                Some(control) => control.patch_value(&value),
                None => warn!(source = data_pointer, target, "copyValueTo target has no control"),
            }
        }
        true
    }
}

pub struct JsonSchemaForm {
    schema: Value,
    layout: Option<Value>,
    data: Option<Value>,
    options: FormOptions,
    validator: Box<dyn Validator>,
    widgets: Box<dyn WidgetRegistry>,
    state: FormState,
    listeners: BTreeMap<u64, Listener>,
    next_listener: u64,
}

impl JsonSchemaForm {
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            layout: None,
            data: None,
            options: FormOptions::default(),
            validator: Box::new(JsonSchemaValidator),
            widgets: Box::new(WidgetLibrary::default()),
            state: FormState::Uninitialized,
            listeners: BTreeMap::new(),
            next_listener: 0,
        }
    }

    pub fn with_layout(mut self, layout: Value) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_widgets(mut self, widgets: impl WidgetRegistry + 'static) -> Self {
        self.widgets = Box::new(widgets);
        self
    }

    // ————————————————————————————— LIFECYCLE ————————————————————————————— //

    pub fn initialize(&mut self) -> Result<()> {
        self.state = FormState::Uninitialized;
        let normalized = normalize_draft(&self.schema);
        let resolved = resolve_schema(&normalized)?;

        let mut data_map = DataMap::new();
        let mut layout = Layout::default();
        layout.nodes = LayoutBuilder::new(
            &resolved,
            &self.options,
            self.widgets.as_ref(),
            &mut data_map,
            &mut layout.ref_library,
            &mut layout.next_id,
        )
        .build(self.layout.as_ref(), self.data.as_ref())?;
        let controls =
            ControlTreeBuilder::new(&resolved, &self.options, &mut data_map).build_root(self.data.as_ref());
        let compiled = self.validator.compile(&normalized)?;

        let mut live = LiveForm {
            resolved,
            layout,
            controls,
            data_map,
            compiled,
            data: Value::Null,
            report: ValidationReport::default(),
        };
        live.reformat(self.options.return_empty_fields);
        if self.options.validate_on_init {
            live.validate();
        }
        info!(
            layout_nodes = live.layout.nodes.len(),
            data_map = live.data_map.len(),
            valid = live.report.valid,
            "form initialized"
        );
        self.state = FormState::Live(Box::new(live));
        self.emit(&FormEvent::Initialized);
        Ok(())
    }

    /// Drop every tree; the form has to be initialized again.
    pub fn reset_all_values(&mut self) {
        self.state = FormState::Uninitialized;
        self.emit(&FormEvent::Reset);
    }

    /// Replace the external data and rebuild from it.
    pub fn set_data(&mut self, data: Value) -> Result<()> {
        self.data = Some(data);
        self.initialize()
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, FormState::Live(_))
    }

    fn live(&self) -> Option<&LiveForm> {
        match &self.state {
            FormState::Live(live) => Some(&**live),
            FormState::Uninitialized => None,
        }
    }

    // ————————————————————————————— MUTATION —————————————————————————————— //

    /// Write `value` at an indexed data pointer and mirror it to any
    /// `copyValueTo` targets.
    pub fn set_value(&mut self, data_pointer: &str, value: Value) -> bool {
        let FormState::Live(live) = &mut self.state else {
            warn!(data_pointer, "set_value on an uninitialized form");
            return false;
        };
        if !live.write_value(data_pointer, value) {
            return false;
        }
        self.refresh();
        true
    }

    /// Reformat, revalidate, notify.
    fn refresh(&mut self) {
        let FormState::Live(live) = &mut self.state else { return };
        live.reformat(self.options.return_empty_fields);
        let changed = live.validate();
        let data_event = FormEvent::DataChanged(live.data.clone());
        let validation_event = changed.then(|| FormEvent::ValidationChanged(live.report.clone()));
        self.emit(&data_event);
        if let Some(event) = validation_event {
            self.emit(&event);
        }
    }

    /// Format a raw value the way the form formats its own controls.
    pub fn format_data(&self, raw: &Value) -> Option<Value> {
        let live = self.live()?;
        Some(format::format_data(raw, &live.resolved, &live.data_map, self.options.return_empty_fields))
    }

    // ————————————————————————————— LISTENERS ————————————————————————————— //

    /// Listeners see events after the mutation that caused them is complete.
    pub fn on_change(&mut self, listener: impl FnMut(&FormEvent) + 'static) -> u64 {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_change(&mut self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    fn emit(&mut self, event: &FormEvent) {
        for listener in self.listeners.values_mut() {
            listener(event);
        }
    }

    // ————————————————————————————— ACCESSORS ————————————————————————————— //

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// Formatted data.
    pub fn data(&self) -> Option<&Value> {
        self.live().map(|l| &l.data)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.live().map(|l| &l.layout)
    }

    pub fn control_tree(&self) -> Option<&ControlNode> {
        self.live().map(|l| &l.controls)
    }

    pub fn resolved(&self) -> Option<&ResolvedSchema> {
        self.live().map(|l| &l.resolved)
    }

    pub fn data_map(&self) -> Option<&DataMap> {
        self.live().map(|l| &l.data_map)
    }

    pub fn validation(&self) -> Option<&ValidationReport> {
        self.live().map(|l| &l.report)
    }

    pub fn is_valid(&self) -> bool {
        self.live().is_some_and(|l| l.report.valid)
    }

    pub fn validation_errors(&self) -> &[ValidationIssue] {
        self.live().map(|l| l.report.errors.as_slice()).unwrap_or_default()
    }

    pub fn get_control(&self, data_pointer: &str) -> Option<&ControlNode> {
        let keys = pointer::parse(data_pointer)?;
        self.live()?.controls.get(&keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormError;
    use crate::validate::NoopValidator;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "nick": { "type": "string" },
                "age": { "type": "integer" }
            }
        })
    }

    #[test]
    fn initialize_builds_everything() {
        let mut form = JsonSchemaForm::new(schema()).with_data(json!({ "name": "Ada", "age": 36 }));
        assert!(form.data().is_none());
        form.initialize().unwrap();
        assert!(form.is_live());
        assert_eq!(form.data(), Some(&json!({ "name": "Ada", "age": 36 })));
        assert_eq!(form.layout().map(|l| l.nodes.len()), Some(3));
        assert!(form.is_valid());
        assert_eq!(form.get_control("/name").map(ControlNode::value), Some(json!("Ada")));
    }

    #[test]
    fn failed_initialization_leaves_form_uninitialized() {
        let mut form = JsonSchemaForm::new(json!({ "properties": { "a": { "$ref": "#/nope" } } }));
        assert!(matches!(form.initialize(), Err(FormError::UnresolvableRef { .. })));
        assert!(!form.is_live());
        assert!(!form.set_value("/a", json!(1)));
    }

    #[test]
    fn set_value_formats_validates_and_notifies() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut form = JsonSchemaForm::new(schema());
        form.on_change(move |e| sink.borrow_mut().push(e.clone()));
        form.initialize().unwrap();
        // "name" is empty, so it is dropped and reported missing at the root
        assert!(!form.is_valid());
        assert!(!form.control_tree().unwrap().errors().is_empty());

        assert!(form.set_value("/age", json!("12")));
        assert_eq!(form.data().unwrap()["age"], json!(12));
        assert!(form.set_value("/name", json!("Bo")));
        assert!(form.is_valid());
        assert!(form.get_control("/name").unwrap().errors().is_empty());
        assert!(!form.set_value("/missing", json!(1)));

        let seen = events.borrow();
        assert_eq!(seen[0], FormEvent::Initialized);
        assert!(matches!(seen.last(), Some(FormEvent::ValidationChanged(r)) if r.valid));
    }

    #[test]
    fn copy_value_to_mirrors_writes() {
        let layout = json!([{ "key": "name", "copyValueTo": ["nick"] }, "nick"]);
        let mut form = JsonSchemaForm::new(schema()).with_layout(layout).with_validator(NoopValidator);
        form.initialize().unwrap();
        assert!(form.set_value("/name", json!("Grace")));
        assert_eq!(form.data().unwrap()["nick"], json!("Grace"));
    }

    #[test]
    fn listeners_can_be_removed_and_reset_clears() {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let mut form = JsonSchemaForm::new(schema()).with_validator(NoopValidator);
        let id = form.on_change(move |_| *sink.borrow_mut() += 1);
        form.initialize().unwrap();
        assert!(form.off_change(id));
        assert!(!form.off_change(id));
        form.set_value("/nick", json!("x"));
        assert_eq!(*count.borrow(), 1);
        form.reset_all_values();
        assert!(!form.is_live());
        assert!(form.validation_errors().is_empty());
    }

    #[test]
    fn set_data_rebuilds() {
        let mut form = JsonSchemaForm::new(schema()).with_validator(NoopValidator);
        form.initialize().unwrap();
        form.set_data(json!({ "nick": "z" })).unwrap();
        assert_eq!(form.data(), Some(&json!({ "nick": "z" })));
    }
}
