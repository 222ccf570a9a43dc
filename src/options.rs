//! Per-form behavior switches.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::path_de::{from_str_with_path, from_value_with_path};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FormOptions {
    /// Items a list array starts with when there is no data for it.
    pub list_items: usize,
    pub addable: bool,
    pub removable: bool,
    pub orderable: bool,
    /// Keep empty leaves in formatted data instead of dropping them.
    pub return_empty_fields: bool,
    pub set_schema_defaults: bool,
    pub set_layout_defaults: bool,
    /// Append a submit button when the layout has none.
    pub add_submit: bool,
    pub validate_on_init: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            list_items: 0,
            addable: true,
            removable: true,
            orderable: true,
            return_empty_fields: false,
            set_schema_defaults: true,
            set_layout_defaults: true,
            add_submit: false,
            validate_on_init: true,
        }
    }
}

impl FormOptions {
    pub fn from_value(value: Value) -> Result<Self> {
        from_value_with_path(value)
    }

    pub fn from_json_str(src: &str) -> Result<Self> {
        from_str_with_path(src)
    }
}
