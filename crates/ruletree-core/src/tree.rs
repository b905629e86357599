//! Rule trees and path helpers.
//!
//! The shape of each entry is decided once, when the tree is built: a single
//! leaf rule, a chain of leaf rules to be combined, or a nested subtree.
//! Keys are unique and kept in definition order.

use serde_json::{Map, Value};
use tracing::warn;

/// Field path from the root of a tree.
pub type Path = Vec<String>;

/// One entry of a rule tree.
#[derive(Debug, Clone)]
pub enum RuleNode<L> {
    /// A single leaf rule.
    Leaf(L),
    /// An ordered sequence of leaf rules, combined before invocation.
    Chain(Vec<L>),
    /// A nested rule tree ("go deeper").
    Tree(RuleTree<L>),
}

/// Ordered mapping of field names to rule entries.
#[derive(Debug, Clone)]
pub struct RuleTree<L> {
    entries: Vec<(String, RuleNode<L>)>,
}

impl<L> Default for RuleTree<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<L> RuleTree<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. An existing key is replaced in place, keeping its
    /// position; the previous entry is returned.
    pub fn insert(&mut self, key: impl Into<String>, node: RuleNode<L>) -> Option<RuleNode<L>> {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, node)),
            None => {
                self.entries.push((key, node));
                None
            }
        }
    }

    /// Builder: attach a single rule at `key`.
    pub fn leaf(mut self, key: impl Into<String>, rule: L) -> Self {
        self.insert(key, RuleNode::Leaf(rule));
        self
    }

    /// Builder: attach a chain of rules at `key`.
    ///
    /// An empty chain is not a legal entry; it is reported and the field is
    /// left without a rule.
    pub fn chain(mut self, key: impl Into<String>, rules: impl IntoIterator<Item = L>) -> Self {
        let key = key.into();
        let rules: Vec<L> = rules.into_iter().collect();
        if rules.is_empty() {
            warn!(field = %key, "empty rule chain ignored");
            return self;
        }
        self.insert(key, RuleNode::Chain(rules));
        self
    }

    /// Builder: attach a nested rule tree at `key`.
    pub fn subtree(mut self, key: impl Into<String>, tree: RuleTree<L>) -> Self {
        self.insert(key, RuleNode::Tree(tree));
        self
    }

    pub fn get(&self, key: &str) -> Option<&RuleNode<L>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleNode<L>)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every path that ends in a leaf or chain, in traversal order.
    pub fn leaf_paths(&self) -> Vec<Path> {
        fn collect<L>(tree: &RuleTree<L>, prefix: &mut Path, out: &mut Vec<Path>) {
            for (key, node) in tree.iter() {
                prefix.push(key.to_string());
                match node {
                    RuleNode::Tree(subtree) => collect(subtree, prefix, out),
                    RuleNode::Leaf(_) | RuleNode::Chain(_) => out.push(prefix.clone()),
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        collect(self, &mut Vec::new(), &mut out);
        out
    }
}

/// Assign `value` at `path`, creating intermediate mappings as needed.
///
/// A non-mapping value sitting where an intermediate mapping is needed is
/// replaced. Existing keys keep their position.
pub fn assign_path(target: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut cursor = target;
    for key in parents {
        let slot = cursor
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        cursor = next;
    }
    cursor.insert(last.clone(), value);
}

/// Read the value at `path`, descending through nested mappings.
pub fn lookup_path<'a, K: AsRef<str>>(map: &'a Map<String, Value>, path: &[K]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(first.as_ref())?;
    for key in rest {
        current = current.as_object()?.get(key.as_ref())?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(parts: &[&str]) -> Path {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut tree = RuleTree::new().leaf("a", 1).leaf("b", 2).leaf("c", 3);
        let previous = tree.insert("b", RuleNode::Leaf(20));
        assert!(matches!(previous, Some(RuleNode::Leaf(2))));
        let keys: Vec<&str> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(matches!(tree.get("b"), Some(RuleNode::Leaf(20))));
    }

    #[test]
    fn empty_chain_is_skipped() {
        let tree: RuleTree<u8> = RuleTree::new().chain("name", Vec::new()).leaf("age", 1);
        assert_eq!(tree.len(), 1);
        assert!(tree.get("name").is_none());
    }

    #[test]
    fn leaf_paths_follow_definition_order() {
        let tree = RuleTree::new()
            .leaf("z", 0)
            .subtree("address", RuleTree::new().leaf("zip", 1).chain("city", [2, 3]))
            .leaf("a", 4);
        assert_eq!(
            tree.leaf_paths(),
            vec![
                path(&["z"]),
                path(&["address", "zip"]),
                path(&["address", "city"]),
                path(&["a"]),
            ]
        );
    }

    #[test]
    fn assign_creates_and_overwrites_intermediates() {
        let mut map = json!({"a": 1, "b": "scalar"}).as_object().cloned().unwrap();
        assign_path(&mut map, &path(&["b", "c"]), json!(true));
        assign_path(&mut map, &path(&["d", "e", "f"]), json!("x"));
        assign_path(&mut map, &path(&["a"]), json!(2));
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"a":2,"b":{"c":true},"d":{"e":{"f":"x"}}}"#
        );
    }

    #[test]
    fn lookup_descends_mappings_only() {
        let map = json!({"a": {"b": [1, 2]}}).as_object().cloned().unwrap();
        assert_eq!(lookup_path(&map, &["a", "b"]), Some(&json!([1, 2])));
        assert_eq!(lookup_path(&map, &["a", "b", "c"]), None);
        assert_eq!(lookup_path::<&str>(&map, &[]), None);
    }
}
