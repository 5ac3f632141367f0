//! Structural properties of canonical trees

use crate::feature;
use proptest::prelude::*;
use revtree::tree::walk::all_features;
use revtree::tree::{diff, DiffEntry};
use revtree::{MemoryObjectStore, RevTree, TreeBuilder};
use std::collections::BTreeSet;
use std::sync::Arc;

fn build(store: &Arc<MemoryObjectStore>, names: &[String]) -> RevTree {
    let mut builder = TreeBuilder::new(store.clone());
    for name in names {
        builder.put(feature(name)).unwrap();
    }
    builder.build().unwrap()
}

fn names(keys: &BTreeSet<u32>) -> Vec<String> {
    keys.iter().map(|k| format!("feature.{k}")).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn insertion_order_does_not_change_id(
        shuffled in proptest::collection::btree_set(0u32..5_000, 0..1_400)
            .prop_map(|keys| names(&keys))
            .prop_shuffle(),
    ) {
        let store = Arc::new(MemoryObjectStore::new());
        let mut sorted = shuffled.clone();
        sorted.sort();

        let a = build(&store, &shuffled);
        let b = build(&store, &sorted);
        prop_assert_eq!(a.id(), b.id());
        prop_assert_eq!(a.size(), shuffled.len() as u64);
    }

    #[test]
    fn size_matches_reachable_features(
        keys in proptest::collection::btree_set(0u32..5_000, 0..1_400),
    ) {
        let store = Arc::new(MemoryObjectStore::new());
        let tree = build(&store, &names(&keys));
        let reachable = all_features(store.as_ref(), &tree).unwrap();
        prop_assert_eq!(reachable.len() as u64, tree.size());
        prop_assert_eq!(tree.is_bucketed(), keys.len() > 512);
    }

    #[test]
    fn incremental_edits_match_fresh_build(
        base in proptest::collection::btree_set(0u32..3_000, 0..1_200),
        removed in proptest::collection::btree_set(0u32..3_000, 0..600),
        added in proptest::collection::btree_set(3_000u32..4_000, 0..200),
    ) {
        let store = Arc::new(MemoryObjectStore::new());
        let original = build(&store, &names(&base));

        let mut builder = TreeBuilder::from_tree(store.clone(), original);
        for name in names(&removed) {
            builder.remove(&name).unwrap();
        }
        for name in names(&added) {
            builder.put(feature(&name)).unwrap();
        }
        let edited = builder.build().unwrap();

        let expected: BTreeSet<u32> = base
            .difference(&removed)
            .copied()
            .chain(added.iter().copied())
            .collect();
        let fresh = build(&store, &names(&expected));
        prop_assert_eq!(edited.id(), fresh.id());
        prop_assert_eq!(edited.size(), expected.len() as u64);
    }

    #[test]
    fn diff_is_symmetric(
        left in proptest::collection::btree_set(0u32..2_000, 0..900),
        right in proptest::collection::btree_set(0u32..2_000, 0..900),
    ) {
        let store = Arc::new(MemoryObjectStore::new());
        let a = build(&store, &names(&left));
        let b = build(&store, &names(&right));

        let forward = diff(store.as_ref(), &a, &b).unwrap();
        let backward = diff(store.as_ref(), &b, &a).unwrap();
        prop_assert_eq!(forward.len(), left.symmetric_difference(&right).count());
        prop_assert_eq!(forward.len(), backward.len());
        for (f, b) in forward.iter().zip(backward.iter()) {
            prop_assert_eq!(f.path(), b.path());
            let mirrored = matches!(
                (f, b),
                (DiffEntry::Added { .. }, DiffEntry::Removed { .. })
                    | (DiffEntry::Removed { .. }, DiffEntry::Added { .. })
            );
            prop_assert!(mirrored);
        }
    }
}

#[test]
fn test_split_and_collapse_thresholds() {
    let store = Arc::new(MemoryObjectStore::new());
    let at_limit: Vec<String> = (0..512).map(|i| format!("f{i}")).collect();
    let flat = build(&store, &at_limit);
    assert!(!flat.is_bucketed());
    assert_eq!(flat.features().len(), 512);

    let mut builder = TreeBuilder::from_tree(store.clone(), flat);
    builder.put(feature("one-more")).unwrap();
    let split = builder.build().unwrap();
    assert!(split.is_bucketed());
    assert!(split.features().is_empty() && split.trees().is_empty());
    assert_eq!(split.size(), 513);

    let mut builder = TreeBuilder::from_tree(store.clone(), split);
    builder.remove("one-more").unwrap();
    let collapsed = builder.build().unwrap();
    assert!(!collapsed.is_bucketed());
    assert_eq!(collapsed.id(), build(&store, &at_limit).id());
}

#[test]
fn test_rebuilding_unchanged_tree_returns_original() {
    let store = Arc::new(MemoryObjectStore::new());
    let names: Vec<String> = (0..900).map(|i| format!("f{i}")).collect();
    let tree = build(&store, &names);

    let mut builder = TreeBuilder::from_tree(store.clone(), tree.clone());
    builder.put(feature("f10")).unwrap();
    builder.remove("does-not-exist").unwrap();
    assert_eq!(builder.build().unwrap(), tree);
}
