//! Integration tests for the revision tree engine

mod copy_between_stores;
mod quad_index;
mod store_conformance;
mod traversal;
mod tree_properties;
mod writer_thread;

use revtree::tree::RevFeature;
use revtree::{Node, ObjectStore};

/// Feature node whose payload is its own name; the payload is stored too.
pub fn stored_feature(store: &dyn ObjectStore, name: &str) -> Node {
    let feature = RevFeature::new(name.as_bytes().to_vec());
    let node = feature.node(name);
    store
        .put(feature.into())
        .expect("store put");
    node
}

/// Feature node without storing its payload.
pub fn feature(name: &str) -> Node {
    RevFeature::new(name.as_bytes().to_vec()).node(name)
}
