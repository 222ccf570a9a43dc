//! Abstract control tree. Groups are keyed by property name, arrays by
//! position, so an indexed data pointer addresses its control directly.
pub mod build;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

pub use build::ControlTreeBuilder;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControlNode {
    Leaf(LeafControl),
    Group(GroupControl),
    Array(ArrayControl),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LeafControl {
    pub value: Value,
    pub dirty: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupControl {
    pub controls: IndexMap<String, ControlNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ArrayControl {
    pub controls: Vec<ControlNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ControlNode {
    pub fn leaf(value: Value) -> Self {
        ControlNode::Leaf(LeafControl { value, ..Default::default() })
    }

    /// Raw (unformatted) value of the subtree.
    pub fn value(&self) -> Value {
        match self {
            ControlNode::Leaf(leaf) => leaf.value.clone(),
            ControlNode::Group(group) => {
                Value::Object(group.controls.iter().map(|(k, c)| (k.clone(), c.value())).collect::<Map<_, _>>())
            }
            ControlNode::Array(array) => Value::Array(array.controls.iter().map(ControlNode::value).collect()),
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ControlNode::Leaf(c) => &c.errors,
            ControlNode::Group(c) => &c.errors,
            ControlNode::Array(c) => &c.errors,
        }
    }

    fn errors_mut(&mut self) -> &mut Vec<String> {
        match self {
            ControlNode::Leaf(c) => &mut c.errors,
            ControlNode::Group(c) => &mut c.errors,
            ControlNode::Array(c) => &mut c.errors,
        }
    }

    pub fn child(&self, key: &str) -> Option<&ControlNode> {
        match self {
            ControlNode::Group(group) => group.controls.get(key),
            ControlNode::Array(array) => array.controls.get(key.parse::<usize>().ok()?),
            ControlNode::Leaf(_) => None,
        }
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut ControlNode> {
        match self {
            ControlNode::Group(group) => group.controls.get_mut(key),
            ControlNode::Array(array) => array.controls.get_mut(key.parse::<usize>().ok()?),
            ControlNode::Leaf(_) => None,
        }
    }

    pub fn get<S: AsRef<str>>(&self, keys: &[S]) -> Option<&ControlNode> {
        keys.iter().try_fold(self, |node, key| node.child(key.as_ref()))
    }

    pub fn get_mut<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<&mut ControlNode> {
        let mut node = self;
        for key in keys {
            node = node.child_mut(key.as_ref())?;
        }
        Some(node)
    }

    pub fn len(&self) -> usize {
        match self {
            ControlNode::Group(group) => group.controls.len(),
            ControlNode::Array(array) => array.controls.len(),
            ControlNode::Leaf(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a child: by name in a group (refusing occupied names), by
    /// position in an array (at most one past the end).
    pub fn insert_child(&mut self, key: &str, child: ControlNode) -> bool {
        match self {
            ControlNode::Group(group) => {
                if group.controls.contains_key(key) {
                    return false;
                }
                group.controls.insert(key.to_string(), child);
                true
            }
            ControlNode::Array(array) => match key.parse::<usize>() {
                Ok(i) if i <= array.controls.len() => {
                    array.controls.insert(i, child);
                    true
                }
                _ if key == "-" => {
                    array.controls.push(child);
                    true
                }
                _ => false,
            },
            ControlNode::Leaf(_) => false,
        }
    }

    pub fn remove_child(&mut self, key: &str) -> Option<ControlNode> {
        match self {
            ControlNode::Group(group) => group.controls.shift_remove(key),
            ControlNode::Array(array) => {
                let i = key.parse::<usize>().ok()?;
                (i < array.controls.len()).then(|| array.controls.remove(i))
            }
            ControlNode::Leaf(_) => None,
        }
    }

    pub fn move_child(&mut self, old: usize, new: usize) -> bool {
        let ControlNode::Array(array) = self else { return false };
        if old >= array.controls.len() || new >= array.controls.len() {
            return false;
        }
        let moved = array.controls.remove(old);
        array.controls.insert(new, moved);
        true
    }

    /// Write `value` into the subtree without changing its shape: leaves
    /// take the value, containers pass matching members down.
    pub fn patch_value(&mut self, value: &Value) {
        match self {
            ControlNode::Leaf(leaf) => {
                leaf.value = value.clone();
                leaf.dirty = true;
            }
            ControlNode::Group(group) => {
                let Value::Object(members) = value else { return };
                for (key, member) in members {
                    if let Some(child) = group.controls.get_mut(key) {
                        child.patch_value(member);
                    }
                }
            }
            ControlNode::Array(array) => {
                let Value::Array(items) = value else { return };
                for (child, item) in array.controls.iter_mut().zip(items) {
                    child.patch_value(item);
                }
            }
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors_mut().clear();
        match self {
            ControlNode::Group(group) => group.controls.values_mut().for_each(ControlNode::clear_errors),
            ControlNode::Array(array) => array.controls.iter_mut().for_each(ControlNode::clear_errors),
            ControlNode::Leaf(_) => {}
        }
    }

    /// Attach `message` at `keys`, or at the deepest existing ancestor.
    pub fn attach_error<S: AsRef<str>>(&mut self, keys: &[S], message: &str) {
        if let Some((first, rest)) = keys.split_first() {
            if let Some(child) = self.child_mut(first.as_ref()) {
                child.attach_error(rest, message);
                return;
            }
        }
        self.errors_mut().push(message.to_string());
    }

    pub fn dirty(&self) -> bool {
        match self {
            ControlNode::Leaf(leaf) => leaf.dirty,
            ControlNode::Group(group) => group.controls.values().any(ControlNode::dirty),
            ControlNode::Array(array) => array.controls.iter().any(ControlNode::dirty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ControlNode {
        let mut tags = ArrayControl::default();
        tags.controls.push(ControlNode::leaf(json!("a")));
        tags.controls.push(ControlNode::leaf(json!("b")));
        let mut root = GroupControl::default();
        root.controls.insert("name".into(), ControlNode::leaf(json!("")));
        root.controls.insert("tags".into(), ControlNode::Array(tags));
        ControlNode::Group(root)
    }

    #[test]
    fn value_mirrors_structure() {
        assert_eq!(sample().value(), json!({ "name": "", "tags": ["a", "b"] }));
    }

    #[test]
    fn children_by_pointer_keys() {
        let mut c = sample();
        assert_eq!(c.get(&["tags", "1"]).map(ControlNode::value), Some(json!("b")));
        assert!(c.get(&["tags", "7"]).is_none());
        c.get_mut(&["tags", "0"]).unwrap().patch_value(&json!("z"));
        assert!(c.dirty());
        assert_eq!(c.value()["tags"], json!(["z", "b"]));
    }

    #[test]
    fn structural_edits() {
        let mut c = sample();
        let tags = c.child_mut("tags").unwrap();
        assert!(tags.insert_child("-", ControlNode::leaf(json!("c"))));
        assert!(tags.move_child(2, 0));
        assert_eq!(tags.value(), json!(["c", "a", "b"]));
        assert_eq!(tags.remove_child("1").map(|n| n.value()), Some(json!("a")));
        assert!(!tags.insert_child("9", ControlNode::leaf(json!("x"))));
        assert!(!c.insert_child("name", ControlNode::leaf(json!("dup"))));
    }

    #[test]
    fn errors_land_on_nearest_ancestor() {
        let mut c = sample();
        c.attach_error(&["tags", "1"], "bad tag");
        c.attach_error(&["missing", "deep"], "root level");
        assert_eq!(c.get(&["tags", "1"]).unwrap().errors(), ["bad tag".to_string()]);
        assert_eq!(c.errors(), ["root level".to_string()]);
        c.clear_errors();
        assert!(c.errors().is_empty());
        assert!(c.get(&["tags", "1"]).unwrap().errors().is_empty());
    }
}
