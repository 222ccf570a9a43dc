//! Widget lookup. The layout only asks for a handle by tag; what a handle
//! renders as is the caller's business.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WidgetHandle {
    /// Tag the layout asked for.
    pub tag: String,
    /// Component the registry resolved it to.
    pub component: String,
}

pub trait WidgetRegistry {
    fn resolve(&self, tag: &str, options: &Map<String, Value>) -> Option<WidgetHandle>;
}

/// Tag → component table with aliases.
#[derive(Clone, Debug)]
pub struct WidgetLibrary {
    components: IndexMap<String, String>,
    aliases: IndexMap<String, String>,
}

const INPUTS: [&str; 19] = [
    "none", "hidden", "text", "textarea", "password", "email", "url", "tel", "search", "number",
    "integer", "range", "color", "date", "datetime-local", "time", "month", "week", "file",
];
const CHOICES: [&str; 5] = ["select", "radios", "checkbox", "checkboxes", "button"];
const CONTAINERS: [&str; 9] =
    ["section", "fieldset", "div", "flex", "tabs", "tab", "array", "tabarray", "$ref"];
const EXTRAS: [&str; 4] = ["submit", "help", "message", "html"];

const ALIASES: [(&str, &str); 9] = [
    ("string", "text"),
    ("boolean", "checkbox"),
    ("object", "section"),
    ("datetime", "datetime-local"),
    ("uri", "url"),
    ("radiobuttons", "radios"),
    ("advancedfieldset", "fieldset"),
    ("msg", "message"),
    ("wizard", "tabs"),
];

impl Default for WidgetLibrary {
    fn default() -> Self {
        let mut lib = Self::empty();
        for tag in INPUTS.iter().chain(&CHOICES).chain(&CONTAINERS).chain(&EXTRAS) {
            lib.register(*tag, *tag);
        }
        for (alias, tag) in ALIASES {
            lib.alias(alias, tag);
        }
        lib
    }
}

impl WidgetLibrary {
    pub fn empty() -> Self {
        Self { components: IndexMap::new(), aliases: IndexMap::new() }
    }

    pub fn register(&mut self, tag: impl Into<String>, component: impl Into<String>) {
        self.components.insert(tag.into(), component.into());
    }

    pub fn alias(&mut self, alias: impl Into<String>, tag: impl Into<String>) {
        self.aliases.insert(alias.into(), tag.into());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.components.contains_key(self.canonical(tag))
    }

    fn canonical<'a>(&'a self, tag: &'a str) -> &'a str {
        self.aliases.get(tag).map(String::as_str).unwrap_or(tag)
    }
}

impl WidgetRegistry for WidgetLibrary {
    fn resolve(&self, tag: &str, options: &Map<String, Value>) -> Option<WidgetHandle> {
        // a select the layout wants as radio buttons
        let tag = match (tag, options.get("radios")) {
            ("select", Some(Value::Bool(true))) => "radios",
            _ => tag,
        };
        let component = self.components.get(self.canonical(tag))?;
        Some(WidgetHandle { tag: tag.to_string(), component: component.clone() })
    }
}
