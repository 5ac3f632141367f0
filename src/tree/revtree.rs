//! Immutable, content-addressed tree objects.

use crate::error::TreeError;
use crate::tree::envelope::{union_all, Envelope};
use crate::tree::hasher::{hash_feature, hash_tree};
use crate::tree::node::{Bucket, Node, NodeKind};
use crate::tree::order::node_order;
use crate::types::ContentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A versioned snapshot of a collection.
///
/// Either *flat* (sorted `trees` and `features` lists) or *bucketed* (sparse
/// bucket map), never both. Ids are always computed from content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevTree {
    id: ContentId,
    size: u64,
    num_trees: u32,
    trees: Vec<Node>,
    features: Vec<Node>,
    buckets: BTreeMap<u32, Bucket>,
}

impl RevTree {
    /// The canonical empty tree.
    pub fn empty() -> Self {
        RevTree {
            id: empty_tree_id(),
            size: 0,
            num_trees: 0,
            trees: Vec::new(),
            features: Vec::new(),
            buckets: BTreeMap::new(),
        }
    }

    /// Create a flat tree. Node lists are sorted into canonical order here.
    pub(crate) fn leaf(
        size: u64,
        num_trees: u32,
        mut features: Vec<Node>,
        mut trees: Vec<Node>,
    ) -> Result<Self, TreeError> {
        if features.iter().any(Node::is_tree) || trees.iter().any(|n| !n.is_tree()) {
            return Err(TreeError::Invariant(
                "leaf tree node lists hold mismatched node kinds".to_string(),
            ));
        }
        features.sort_by(node_order);
        trees.sort_by(node_order);
        let id = hash_tree(&trees, &features, &BTreeMap::new());
        Ok(RevTree {
            id,
            size,
            num_trees,
            trees,
            features,
            buckets: BTreeMap::new(),
        })
    }

    /// Create a bucketed tree.
    pub(crate) fn bucketed(
        size: u64,
        num_trees: u32,
        buckets: BTreeMap<u32, Bucket>,
    ) -> Result<Self, TreeError> {
        if let Some((index, bucket)) = buckets.iter().find(|(i, b)| **i != b.index()) {
            return Err(TreeError::Invariant(format!(
                "bucket keyed {} carries index {}",
                index,
                bucket.index()
            )));
        }
        let id = hash_tree(&[], &[], &buckets);
        Ok(RevTree {
            id,
            size,
            num_trees,
            trees: Vec::new(),
            features: Vec::new(),
            buckets,
        })
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    /// Number of feature leaves reachable from this tree.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of tree nodes reachable from this tree, buckets excluded.
    pub fn num_trees(&self) -> u32 {
        self.num_trees
    }

    pub fn trees(&self) -> &[Node] {
        &self.trees
    }

    pub fn features(&self) -> &[Node] {
        &self.features
    }

    pub fn buckets(&self) -> &BTreeMap<u32, Bucket> {
        &self.buckets
    }

    pub fn is_bucketed(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// True for a tree with no entries of any kind.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty() && self.features.is_empty() && self.buckets.is_empty()
    }

    /// Direct node entries of a flat tree: trees first, then features.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.trees.iter().chain(self.features.iter())
    }

    /// Number of direct entries (nodes or buckets).
    pub fn entry_count(&self) -> usize {
        self.trees.len() + self.features.len() + self.buckets.len()
    }

    /// Aggregate bounds of the direct entries.
    pub fn bounds(&self) -> Option<Envelope> {
        if self.is_bucketed() {
            union_all(self.buckets.values().map(Bucket::bounds))
        } else {
            union_all(self.children().map(Node::bounds))
        }
    }

    /// Look a direct child up by name in a flat tree.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().find(|n| n.name() == name)
    }

    pub(crate) fn check_invariants(&self) -> Result<(), TreeError> {
        if self.is_bucketed() && (!self.trees.is_empty() || !self.features.is_empty()) {
            return Err(TreeError::Invariant(format!(
                "tree {} holds both nodes and buckets",
                self.id
            )));
        }
        Ok(())
    }
}

impl PartialEq for RevTree {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RevTree {}

/// Id of the canonical empty tree.
pub fn empty_tree_id() -> ContentId {
    hash_tree(&[], &[], &BTreeMap::new())
}

/// An opaque, content-addressed feature record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevFeature {
    id: ContentId,
    data: Vec<u8>,
}

impl RevFeature {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        RevFeature {
            id: hash_feature(&data),
            data,
        }
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// A feature node pointing at this record.
    pub fn node(&self, name: impl Into<String>) -> Node {
        Node::new(name, NodeKind::Feature, self.id, None, None)
    }
}

/// Any object an [`ObjectStore`](crate::store::ObjectStore) holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevObject {
    Tree(RevTree),
    Feature(RevFeature),
}

impl RevObject {
    pub fn id(&self) -> &ContentId {
        match self {
            RevObject::Tree(tree) => tree.id(),
            RevObject::Feature(feature) => feature.id(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RevObject::Tree(_) => "tree",
            RevObject::Feature(_) => "feature",
        }
    }
}

impl From<RevTree> for RevObject {
    fn from(tree: RevTree) -> Self {
        RevObject::Tree(tree)
    }
}

impl From<RevFeature> for RevObject {
    fn from(feature: RevFeature) -> Self {
        RevObject::Feature(feature)
    }
}
