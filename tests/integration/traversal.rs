//! Traversal and diff over nested, bucketed trees

use crate::{feature, stored_feature};
use revtree::tree::walk::{all_features, walk, WalkStrategy};
use revtree::tree::{diff, DiffEntry};
use revtree::{MemoryObjectStore, Node, ObjectStore, RevTree, TreeBuilder};
use std::collections::BTreeSet;
use std::sync::Arc;

/// `roads` (800 features) and `rivers` (5 features) under one root.
fn layered(store: &Arc<MemoryObjectStore>) -> RevTree {
    let mut roads = TreeBuilder::new(store.clone());
    for i in 0..800 {
        roads.put(stored_feature(store.as_ref(), &format!("road-{i}"))).unwrap();
    }
    let roads = roads.build().unwrap();

    let mut rivers = TreeBuilder::new(store.clone());
    for i in 0..5 {
        rivers.put(stored_feature(store.as_ref(), &format!("river-{i}"))).unwrap();
    }
    let rivers = rivers.build().unwrap();

    let mut root = TreeBuilder::new(store.clone());
    root.put(Node::tree("roads", *roads.id())).unwrap();
    root.put(Node::tree("rivers", *rivers.id())).unwrap();
    root.build().unwrap()
}

#[test]
fn test_walk_reaches_every_feature_once() {
    let store = Arc::new(MemoryObjectStore::new());
    let root = layered(&store);
    assert_eq!(root.size(), 805);
    assert_eq!(root.num_trees(), 2);

    let paths: Vec<String> = all_features(store.as_ref(), &root)
        .unwrap()
        .into_iter()
        .map(|entry| entry.path)
        .collect();
    let unique: BTreeSet<&String> = paths.iter().collect();
    assert_eq!(paths.len(), 805);
    assert_eq!(unique.len(), 805);
    assert!(unique.contains(&"roads/road-799".to_string()));

    for entry in all_features(store.as_ref(), &root).unwrap() {
        let payload = store.get_feature(entry.node.id()).unwrap();
        assert_eq!(payload.data(), entry.node.name().as_bytes());
    }
}

#[test]
fn test_walk_is_restartable() {
    let store = Arc::new(MemoryObjectStore::new());
    let root = layered(&store);
    let first: Vec<String> = walk(store.as_ref(), &root, WalkStrategy::DepthFirst)
        .map(|e| e.unwrap().path)
        .collect();
    let second: Vec<String> = walk(store.as_ref(), &root, WalkStrategy::DepthFirst)
        .map(|e| e.unwrap().path)
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 807);

    let direct = walk(store.as_ref(), &root, WalkStrategy::Children).count();
    assert_eq!(direct, 2);
}

#[test]
fn test_diff_reports_nested_changes() {
    let store = Arc::new(MemoryObjectStore::new());
    let before = layered(&store);

    let roads_node = before.child("roads").unwrap().clone();
    let roads = store.get_tree(roads_node.id()).unwrap();
    let mut edit = TreeBuilder::from_tree(store.clone(), roads);
    edit.remove("road-17").unwrap();
    edit.put(feature("road-new")).unwrap();
    let roads = edit.build().unwrap();

    let mut root = TreeBuilder::from_tree(store.clone(), before.clone());
    root.update(&roads_node, Node::tree("roads", *roads.id())).unwrap();
    root.remove("rivers").unwrap();
    let after = root.build().unwrap();
    assert_eq!(after.size(), 800);

    let entries = diff(store.as_ref(), &before, &after).unwrap();
    let summary: Vec<(&str, &str)> = entries
        .iter()
        .map(|e| {
            let kind = match e {
                DiffEntry::Added { .. } => "added",
                DiffEntry::Removed { .. } => "removed",
                DiffEntry::Modified { .. } => "modified",
            };
            (kind, e.path())
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("removed", "rivers"),
            ("removed", "rivers/river-0"),
            ("removed", "rivers/river-1"),
            ("removed", "rivers/river-2"),
            ("removed", "rivers/river-3"),
            ("removed", "rivers/river-4"),
            ("modified", "roads"),
            ("removed", "roads/road-17"),
            ("added", "roads/road-new"),
        ]
    );
}
