//! JSON-Schema driven forms: resolve a schema, build a layout tree and a
//! control tree from it, and keep schema-typed data in step with edits.
//!
//! ```no_run
//! use schemaform::{ItemContext, JsonSchemaForm};
//! use serde_json::json;
//!
//! let mut form = JsonSchemaForm::new(json!({
//!     "type": "object",
//!     "properties": { "tags": { "type": "array", "items": { "type": "string" } } }
//! }));
//! form.initialize()?;
//! form.add_item(&ItemContext::new([], [0]), None);
//! form.set_value("/tags/0", json!("rust"));
//! assert_eq!(form.data(), Some(&json!({ "tags": ["rust"] })));
//! # Ok::<(), schemaform::FormError>(())
//! ```
pub mod control;
pub mod data_map;
pub mod error;
pub mod form;
pub mod layout;
pub mod options;
pub mod path_de;
pub mod pointer;
pub mod schema;
pub mod validate;

pub use control::{ControlNode, ControlTreeBuilder};
pub use data_map::{DataMap, DataMapEntry};
pub use error::{FormError, Result};
pub use form::{FormEvent, ItemContext, JsonSchemaForm};
pub use layout::{Layout, LayoutBuilder, LayoutNode, WidgetHandle, WidgetLibrary, WidgetRegistry};
pub use options::FormOptions;
pub use schema::{ResolvedSchema, normalize_draft, resolve_schema};
pub use validate::{CompiledValidator, JsonSchemaValidator, NoopValidator, ValidationIssue, ValidationReport, Validator};
