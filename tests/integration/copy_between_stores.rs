//! Fork/join copy between a sled store and a memory store

use crate::stored_feature;
use revtree::tree::walk::all_features;
use revtree::{copy_trees, MemoryObjectStore, ObjectStore, SledObjectStore, TreeBuilder};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_copy_many_roots_from_sled() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(SledObjectStore::open(dir.path()).unwrap());

    let mut roots = Vec::new();
    for layer in 0..6 {
        let mut builder = TreeBuilder::new(source.clone());
        for i in 0..(100 * (layer + 1)) {
            let node = stored_feature(source.as_ref(), &format!("layer{layer}-{i}"));
            builder.put(node).unwrap();
        }
        roots.push(*builder.build().unwrap().id());
    }

    let target = Arc::new(MemoryObjectStore::new());
    let report = copy_trees(source.clone(), target.clone(), roots.clone())
        .await
        .unwrap();
    assert_eq!(report.features_copied, 2100);
    assert_eq!(report.missing_features, 0);

    for root in &roots {
        let tree = target.get_tree(root).unwrap();
        let features = all_features(target.as_ref(), &tree).unwrap();
        assert_eq!(features.len() as u64, tree.size());
        for entry in features {
            assert!(target.exists(entry.node.id()).unwrap());
        }
    }
}
