//! Content hashing for tree objects
//!
//! Two trees holding the same entries hash to the same [`ContentId`] no
//! matter how they were built. Only entry content is hashed: `size`,
//! `num_trees` and all bounds are derived metadata and stay out of the digest.

use crate::tree::node::{Bucket, Node, NodeKind};
use crate::types::{ContentId, ID_BYTES};
use std::collections::BTreeMap;

const TREE_TAG: u8 = 2;
const FEATURE_TAG: u8 = 3;

/// Compute the id of a tree from its entries.
///
/// `trees` and `features` must already be in canonical node order. A tree is
/// either flat (node lists) or bucketed (bucket map); callers never pass both.
pub fn hash_tree(trees: &[Node], features: &[Node], buckets: &BTreeMap<u32, Bucket>) -> ContentId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[TREE_TAG]);
    for node in trees.iter().chain(features.iter()) {
        update_node(&mut hasher, node);
    }
    for (index, bucket) in buckets {
        hasher.update(&index.to_be_bytes());
        hasher.update(bucket.id().as_bytes());
    }
    finalize(&hasher)
}

/// Compute the id of an opaque feature record.
pub fn hash_feature(data: &[u8]) -> ContentId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[FEATURE_TAG]);
    hasher.update(&(data.len() as u64).to_be_bytes());
    hasher.update(data);
    finalize(&hasher)
}

fn update_node(hasher: &mut blake3::Hasher, node: &Node) {
    let kind: NodeKind = node.kind();
    hasher.update(&[kind.tag()]);
    let name = node.name().as_bytes();
    hasher.update(&(name.len() as u32).to_be_bytes());
    hasher.update(name);
    hasher.update(node.id().as_bytes());
    hasher.update(node.metadata_id().unwrap_or(&ContentId::NULL).as_bytes());
}

fn finalize(hasher: &blake3::Hasher) -> ContentId {
    let mut out = [0u8; ID_BYTES];
    hasher.finalize_xof().fill(&mut out);
    ContentId::from_bytes(out)
}
