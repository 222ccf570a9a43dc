//! Indexed ↔ generic pointer conversion.
//!
//! A generic pointer replaces every list position with `-`; tuple positions
//! keep their literal index because each one has its own schema. The
//! [`ArrayMap`] records, per generic array pointer, how many leading
//! positions are tuple slots.
use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use super::{compile, is_sub_pointer, parse};

/// Generic array pointer → number of fixed tuple items.
///
/// Every array the schema declares has an entry, lists included with a
/// count of 0: [`to_generic_pointer`] only rewrites indices under
/// registered prefixes, so a list without an entry would keep its literal
/// positions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArrayMap(IndexMap<String, usize>);

/// Pointer → the ancestor pointer it recursively refers back to.
pub type RecursiveRefMap = IndexMap<String, String>;

impl ArrayMap {
    pub fn new() -> Self { Self::default() }

    /// Entries are written once; a second registration is ignored.
    pub fn register(&mut self, generic_pointer: impl Into<String>, tuple_items: usize) -> bool {
        let key = generic_pointer.into();
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, tuple_items);
        true
    }

    pub fn get(&self, generic_pointer: &str) -> Option<usize> { self.0.get(generic_pointer).copied() }
    pub fn contains(&self, generic_pointer: &str) -> bool { self.0.contains_key(generic_pointer) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, usize)> for ArrayMap {
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        let mut map = ArrayMap::new();
        for (k, v) in iter {
            map.register(k, v);
        }
        map
    }
}

/// Substitute `indices` into the `-` wildcards of `generic`, left to right.
///
/// With an empty `array_map` every wildcard is substituted. Otherwise only
/// wildcards whose generic prefix is a registered array are; any other `-`
/// stays literal. Too few indices is an error (`None`).
pub fn to_indexed_pointer(generic: &str, indices: &[usize], array_map: &ArrayMap) -> Option<String> {
    let keys = parse(generic)?;
    let mut next = indices.iter();
    let mut out = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if key == "-" && (array_map.is_empty() || array_map.contains(&compile(&keys[..i], ""))) {
            let Some(idx) = next.next() else {
                warn!(generic, ?indices, "index array too short for generic pointer");
                return None;
            };
            out.push(idx.to_string());
            continue;
        }
        out.push(key.clone());
    }
    Some(compile(&out, ""))
}

/// Replace every index past the tuple slots of a registered array with `-`.
/// Prefixes are compared in their already-generic form, so nested lists
/// resolve in one left-to-right pass.
pub fn to_generic_pointer(indexed: &str, array_map: &ArrayMap) -> Option<String> {
    let mut keys = parse(indexed)?;
    for i in 0..keys.len() {
        let Some(tuple_items) = array_map.get(&compile(&keys[..i], "")) else { continue };
        if let Ok(idx) = keys[i].parse::<usize>() {
            if idx >= tuple_items {
                keys[i] = "-".to_string();
            }
        }
    }
    Some(compile(&keys, ""))
}

/// Collapse a pointer that runs through recursive references onto its
/// shortest generic form, e.g. `/boss/children/3/name` → `/boss/name` when
/// `/boss/children/-` refers back to `/boss`.
pub fn remove_recursive_references(
    pointer: &str,
    recursive_refs: &RecursiveRefMap,
    array_map: &ArrayMap,
) -> Option<String> {
    let mut generic = to_generic_pointer(pointer, array_map)?;
    loop {
        let mut changed = false;
        for (from, to) in recursive_refs {
            if from == to || !is_sub_pointer(to, from) {
                continue;
            }
            while is_sub_pointer(from, &generic) {
                let rebased = format!("{to}{}", &generic[from.len()..]);
                generic = to_generic_pointer(&rebased, array_map)?;
                changed = true;
            }
        }
        if !changed {
            return Some(generic);
        }
    }
}

/// Indices an indexed pointer carries at the wildcard positions of its
/// generic counterpart.
pub fn index_array(indexed: &str, generic: &str) -> Option<Vec<usize>> {
    let indexed = parse(indexed)?;
    let generic = parse(generic)?;
    if indexed.len() != generic.len() {
        return None;
    }
    let mut out = Vec::new();
    for (concrete, pattern) in indexed.iter().zip(&generic) {
        if pattern == "-" {
            out.push(concrete.parse::<usize>().ok()?);
        }
    }
    Some(out)
}
