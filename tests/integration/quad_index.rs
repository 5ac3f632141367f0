//! Spatial (quad) bucket order

use crate::feature;
use proptest::prelude::*;
use revtree::config::QuadSettings;
use revtree::tree::walk::all_features;
use revtree::tree::{Envelope, QuadOrder, QuadOverflow};
use revtree::{BucketOrder, MemoryObjectStore, Node, RevTree, TreeBuilder};
use std::sync::Arc;

fn world() -> BucketOrder {
    BucketOrder::Quad(QuadSettings::default().order().unwrap())
}

fn located(name: &str, x: f64, y: f64) -> Node {
    feature(name).with_bounds(Envelope::point(x, y))
}

fn build(store: &Arc<MemoryObjectStore>, order: BucketOrder, nodes: &[Node]) -> RevTree {
    let mut builder = TreeBuilder::with_order(store.clone(), None, order);
    for node in nodes {
        builder.put(node.clone()).unwrap();
    }
    builder.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn quad_tree_is_order_independent(
        points in proptest::collection::vec((-180.0f64..180.0, -90.0f64..90.0), 0..600)
            .prop_shuffle(),
    ) {
        let store = Arc::new(MemoryObjectStore::new());
        let nodes: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, (x, y))| located(&format!("p{i}"), *x, *y))
            .collect();
        let mut reversed = nodes.clone();
        reversed.reverse();

        let a = build(&store, world(), &nodes);
        let b = build(&store, world(), &reversed);
        prop_assert_eq!(a.id(), b.id());
        prop_assert_eq!(a.size(), nodes.len() as u64);
        prop_assert_eq!(all_features(store.as_ref(), &a).unwrap().len(), nodes.len());
    }
}

#[test]
fn test_unlocated_features_share_the_unpromotables_bucket() {
    let store = Arc::new(MemoryObjectStore::new());
    let mut nodes: Vec<Node> = (0..150)
        .map(|i| located(&format!("p{i}"), 10.0 + i as f64 * 0.1, 10.0))
        .collect();
    nodes.extend((0..20).map(|i| feature(&format!("nowhere{i}"))));

    let tree = build(&store, world(), &nodes);
    assert!(tree.is_bucketed());
    let unpromotables = tree.buckets().get(&4).expect("unpromotables bucket");
    let subtree = store_tree(&store, unpromotables.id());
    assert_eq!(subtree.size(), 20);
    assert!(tree.bounds().is_some());
}

#[test]
fn test_moving_a_feature_keeps_one_copy() {
    let store = Arc::new(MemoryObjectStore::new());
    let nodes: Vec<Node> = (0..300)
        .map(|i| located(&format!("p{i}"), -170.0 + i as f64, if i % 2 == 0 { 45.0 } else { -45.0 }))
        .collect();
    let order = world();
    let tree = build(&store, order.clone(), &nodes);

    let old = nodes[0].clone();
    let moved = located("p0", 120.0, 60.0);
    let mut builder = TreeBuilder::with_order(store.clone(), Some(tree), order.clone());
    builder.update(&old, moved.clone()).unwrap();
    let relocated = builder.build().unwrap();
    assert_eq!(relocated.size(), 300);

    let mut expected = nodes.clone();
    expected[0] = moved;
    assert_eq!(relocated.id(), build(&store, order, &expected).id());
}

#[test]
fn test_expand_policy_grows_bounds() {
    let store = Arc::new(MemoryObjectStore::new());
    let order = QuadOrder::new(Envelope::new(-10.0, -10.0, 10.0, 10.0), 6)
        .unwrap()
        .with_overflow(QuadOverflow::Expand);
    let mut builder = TreeBuilder::with_order(store.clone(), None, BucketOrder::Quad(order));
    for i in 0..200 {
        builder.put(located(&format!("p{i}"), i as f64 - 100.0, 0.5)).unwrap();
    }
    let tree = builder.build().unwrap();
    assert_eq!(tree.size(), 200);

    match builder.order() {
        BucketOrder::Quad(grown) => {
            assert!(grown.max_bounds().contains(&Envelope::point(99.0, 0.5)));
            assert!(grown.max_depth() > 6);
        }
        other => panic!("unexpected order {:?}", other),
    }
    // nothing fell back to unpromotables
    assert!(tree.buckets().get(&4).is_none());
}

fn store_tree(store: &Arc<MemoryObjectStore>, id: &revtree::ContentId) -> RevTree {
    use revtree::ObjectStore;
    store.get_tree(id).unwrap()
}
