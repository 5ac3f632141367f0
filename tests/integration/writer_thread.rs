//! TreeWriter fed from several producer threads

use crate::feature;
use revtree::{MemoryObjectStore, TreeBuilder, TreeError, TreeWriter};
use std::sync::Arc;
use std::thread;

#[test]
fn test_parallel_producers_match_sequential_build() {
    let store = Arc::new(MemoryObjectStore::new());
    let writer = TreeWriter::spawn(TreeBuilder::new(store.clone())).unwrap();

    thread::scope(|scope| {
        for producer in 0..8 {
            let writer = &writer;
            scope.spawn(move || {
                for i in 0..200 {
                    writer.put(feature(&format!("p{producer}-{i}"))).unwrap();
                }
                for i in (0..200).step_by(4) {
                    writer.remove(format!("p{producer}-{i}")).unwrap();
                }
            });
        }
    });
    let tree = writer.finish().unwrap();
    assert_eq!(tree.size(), 8 * 150);

    let mut sequential = TreeBuilder::new(store);
    for producer in 0..8 {
        for i in (0..200).filter(|i| i % 4 != 0) {
            sequential
                .put(feature(&format!("p{producer}-{i}")))
                .unwrap();
        }
    }
    assert_eq!(sequential.build().unwrap().id(), tree.id());
}

#[test]
fn test_invalid_change_surfaces_at_build() {
    let store = Arc::new(MemoryObjectStore::new());
    let writer = TreeWriter::spawn(TreeBuilder::new(store)).unwrap();
    writer.remove("").unwrap();
    assert!(matches!(writer.build(), Err(TreeError::InvalidArgument(_))));
}
