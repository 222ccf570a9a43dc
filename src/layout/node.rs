use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::widget::WidgetHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayItemType {
    List,
    Tuple,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Generic data pointer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetHandle>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LayoutNode>,
    /// Direct child of an array node standing for one data item.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub array_item: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_item_type: Option<ArrayItemType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub removable: bool,
    /// Node stands for (or is the expansion of) a recursive `$ref`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive_reference: bool,
    /// For `$ref` placeholders: generic data pointer of what "add" creates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_pointer: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

impl LayoutNode {
    pub fn is_placeholder(&self) -> bool {
        self.node_type == "$ref"
    }

    pub fn is_array(&self) -> bool {
        self.array_item_type.is_some()
    }

    /// Number of item children, placeholders excluded.
    pub fn item_count(&self) -> usize {
        self.items.iter().filter(|n| n.array_item).count()
    }

    /// Recompute `removable` on the items of an array node: any list item,
    /// only the trailing tuple item, nothing at or below `minItems`.
    pub fn refresh_removable(&mut self, allowed: bool) {
        let Some(kind) = self.array_item_type else { return };
        let min = self.options.get("minItems").and_then(Value::as_u64).unwrap_or(0) as usize;
        let count = self.item_count();
        let tuple = self.options.get("tupleItems").and_then(Value::as_u64).unwrap_or(0) as usize;
        for (i, item) in self.items.iter_mut().filter(|n| n.array_item).enumerate() {
            let position_ok = match kind {
                ArrayItemType::List => i >= tuple,
                ArrayItemType::Tuple => i + 1 == count,
            };
            item.removable = allowed && count > min && position_ok;
        }
    }

    pub fn walk(&self, f: &mut impl FnMut(&LayoutNode)) {
        f(self);
        for child in &self.items {
            child.walk(f);
        }
    }

    fn walk_mut(&mut self, f: &mut impl FnMut(&mut LayoutNode)) {
        f(self);
        for child in &mut self.items {
            child.walk_mut(f);
        }
    }
}

pub fn next_id(counter: &mut u64) -> String {
    *counter += 1;
    format!("node-{counter}")
}

pub fn renumber(node: &mut LayoutNode, counter: &mut u64) {
    node.walk_mut(&mut |n| n.id = next_id(counter));
}

/// Generic item data pointer → layout template for one new item.
pub type LayoutRefLibrary = IndexMap<String, LayoutNode>;

/// The built layout tree plus the templates dynamic nodes are cloned from.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub ref_library: LayoutRefLibrary,
    #[serde(skip)]
    pub next_id: u64,
}

impl Layout {
    /// Node at a `layout[..].items[..]` index path.
    pub fn node_at(&self, path: &[usize]) -> Option<&LayoutNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for i in rest {
            node = node.items.get(*i)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut LayoutNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get_mut(*first)?;
        for i in rest {
            node = node.items.get_mut(*i)?;
        }
        Some(node)
    }

    /// Sibling list holding the node at `path`.
    pub fn siblings_mut(&mut self, path: &[usize]) -> Option<&mut Vec<LayoutNode>> {
        match path.split_last()? {
            (_, []) => Some(&mut self.nodes),
            (_, parent) => self.node_at_mut(parent).map(|n| &mut n.items),
        }
    }

    /// Give `node` and its subtree fresh ids.
    pub fn renumber(&mut self, node: &mut LayoutNode) {
        renumber(node, &mut self.next_id);
    }

    /// Index path of the first node matching `pred`, depth first.
    pub fn find(&self, pred: impl Fn(&LayoutNode) -> bool) -> Option<Vec<usize>> {
        fn search(nodes: &[LayoutNode], path: &mut Vec<usize>, pred: &dyn Fn(&LayoutNode) -> bool) -> bool {
            for (i, node) in nodes.iter().enumerate() {
                path.push(i);
                if pred(node) || search(&node.items, path, pred) {
                    return true;
                }
                path.pop();
            }
            false
        }
        let mut path = Vec::new();
        search(&self.nodes, &mut path, &pred).then_some(path)
    }
}
