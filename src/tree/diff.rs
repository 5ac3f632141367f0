//! Tree diff
//!
//! Compares two trees by node name. Subtrees with equal ids are skipped, and
//! when both sides are bucketed only buckets whose ids differ are opened, so
//! the cost follows the size of the change rather than the size of the trees.

use crate::error::StorageError;
use crate::store::ObjectStore;
use crate::tree::node::{Bucket, Node};
use crate::tree::revtree::RevTree;
use std::collections::BTreeMap;

/// One difference between two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry {
    Added { path: String, node: Node },
    Removed { path: String, node: Node },
    Modified { path: String, old: Node, new: Node },
}

impl DiffEntry {
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Added { path, .. }
            | DiffEntry::Removed { path, .. }
            | DiffEntry::Modified { path, .. } => path,
        }
    }
}

/// Differences turning `left` into `right`, sorted by path.
///
/// Child trees are compared recursively; an added or removed child tree is
/// reported along with every node beneath it.
pub fn diff(
    store: &dyn ObjectStore,
    left: &RevTree,
    right: &RevTree,
) -> Result<Vec<DiffEntry>, StorageError> {
    let mut entries = Vec::new();
    diff_trees(store, "", left, right, &mut entries)?;
    entries.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(entries)
}

fn diff_trees(
    store: &dyn ObjectStore,
    prefix: &str,
    left: &RevTree,
    right: &RevTree,
    out: &mut Vec<DiffEntry>,
) -> Result<(), StorageError> {
    if left.id() == right.id() {
        return Ok(());
    }
    let mut old = BTreeMap::new();
    let mut new = BTreeMap::new();
    changed_nodes(store, left, right, &mut old, &mut new)?;

    for (name, old_node) in &old {
        let path = join(prefix, name);
        match new.get(name) {
            None => removed(store, path, old_node, out)?,
            Some(new_node) if new_node == old_node => {}
            Some(new_node) => {
                out.push(DiffEntry::Modified {
                    path: path.clone(),
                    old: old_node.clone(),
                    new: new_node.clone(),
                });
                let old_sub = subtree(store, old_node)?;
                let new_sub = subtree(store, new_node)?;
                diff_trees(store, &path, &old_sub, &new_sub, out)?;
            }
        }
    }
    for (name, new_node) in &new {
        if !old.contains_key(name) {
            added(store, join(prefix, name), new_node, out)?;
        }
    }
    Ok(())
}

/// Nodes of both sides that may differ, keyed by name. Buckets present on
/// both sides with the same id are left out.
fn changed_nodes(
    store: &dyn ObjectStore,
    left: &RevTree,
    right: &RevTree,
    old: &mut BTreeMap<String, Node>,
    new: &mut BTreeMap<String, Node>,
) -> Result<(), StorageError> {
    if !(left.is_bucketed() && right.is_bucketed()) {
        collect(store, left, old)?;
        collect(store, right, new)?;
        return Ok(());
    }
    let empty = RevTree::empty();
    let indexes: Vec<u32> = left
        .buckets()
        .keys()
        .chain(right.buckets().keys())
        .copied()
        .collect::<std::collections::BTreeSet<u32>>()
        .into_iter()
        .collect();
    for index in indexes {
        let l = left.buckets().get(&index);
        let r = right.buckets().get(&index);
        if l.map(Bucket::id) == r.map(Bucket::id) {
            continue;
        }
        let l = match l {
            Some(bucket) => store.get_tree(bucket.id())?,
            None => empty.clone(),
        };
        let r = match r {
            Some(bucket) => store.get_tree(bucket.id())?,
            None => empty.clone(),
        };
        changed_nodes(store, &l, &r, old, new)?;
    }
    Ok(())
}

/// Every direct node of `tree`, resolving buckets.
fn collect(
    store: &dyn ObjectStore,
    tree: &RevTree,
    out: &mut BTreeMap<String, Node>,
) -> Result<(), StorageError> {
    if tree.is_bucketed() {
        for bucket in tree.buckets().values() {
            let subtree = store.get_tree(bucket.id())?;
            collect(store, &subtree, out)?;
        }
    } else {
        for node in tree.children() {
            out.insert(node.name().to_string(), node.clone());
        }
    }
    Ok(())
}

fn subtree(store: &dyn ObjectStore, node: &Node) -> Result<RevTree, StorageError> {
    if node.is_tree() {
        store.get_tree(node.id())
    } else {
        Ok(RevTree::empty())
    }
}

fn added(
    store: &dyn ObjectStore,
    path: String,
    node: &Node,
    out: &mut Vec<DiffEntry>,
) -> Result<(), StorageError> {
    if node.is_tree() {
        let tree = store.get_tree(node.id())?;
        diff_trees(store, &path, &RevTree::empty(), &tree, out)?;
    }
    out.push(DiffEntry::Added {
        path,
        node: node.clone(),
    });
    Ok(())
}

fn removed(
    store: &dyn ObjectStore,
    path: String,
    node: &Node,
    out: &mut Vec<DiffEntry>,
) -> Result<(), StorageError> {
    if node.is_tree() {
        let tree = store.get_tree(node.id())?;
        diff_trees(store, &path, &tree, &RevTree::empty(), out)?;
    }
    out.push(DiffEntry::Removed {
        path,
        node: node.clone(),
    });
    Ok(())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
