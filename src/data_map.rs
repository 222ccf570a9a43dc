//! Generic data pointer → what the builders learned about that location.
//!
//! Keys are canonical: list positions are `-` and pointers that run through
//! a recursive reference are folded back onto the location they re-enter,
//! so `/boss/children/3/name` and `/boss/name` share one entry.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::schema::{ControlKind, ResolvedSchema};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapEntry {
    pub schema_pointer: Option<String>,
    /// Where the first control for this entry lives, in generic form.
    pub control_pointer: Option<String>,
    pub data_type: Option<String>,
    pub kind: Option<ControlKind>,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copy_value_to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_default: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DataMap(IndexMap<String, DataMapEntry>);

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_mut(&mut self, canonical: &str) -> &mut DataMapEntry {
        self.0.entry(canonical.to_string()).or_default()
    }

    pub fn get(&self, canonical: &str) -> Option<&DataMapEntry> {
        self.0.get(canonical)
    }

    /// Entry for any indexed or generic pointer.
    pub fn lookup(&self, pointer: &str, resolved: &ResolvedSchema) -> Option<&DataMapEntry> {
        self.0.get(&resolved.canonical_data_pointer(pointer)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataMapEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
