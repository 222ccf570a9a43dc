//! Layout tree: what to show, in which order, with which widget.
//!
//! Each data-bound node carries the generic data pointer and the schema
//! pointer it was built from. Array nodes hold one child per data item
//! followed by a `$ref` placeholder that "add" expands.
pub mod build;
pub mod node;
pub mod widget;

pub use build::LayoutBuilder;
pub use node::{ArrayItemType, Layout, LayoutNode, LayoutRefLibrary};
pub use widget::{WidgetHandle, WidgetLibrary, WidgetRegistry};
