//! Tree entry types: named nodes and anonymous bucket pointers

use crate::error::TreeError;
use crate::tree::envelope::Envelope;
use crate::types::ContentId;
use serde::{Deserialize, Serialize};

/// Kind of object a [`Node`] points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// A versioned leaf record
    Feature,
    /// A child tree
    Tree,
}

impl NodeKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            NodeKind::Tree => 2,
            NodeKind::Feature => 3,
        }
    }
}

/// Named pointer to a feature or a child tree.
///
/// Equality ignores `bounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    name: String,
    kind: NodeKind,
    id: ContentId,
    metadata_id: Option<ContentId>,
    bounds: Option<Envelope>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        kind: NodeKind,
        id: ContentId,
        metadata_id: Option<ContentId>,
        bounds: Option<Envelope>,
    ) -> Self {
        Node {
            name: name.into(),
            kind,
            id,
            metadata_id: metadata_id.filter(|m| !m.is_null()),
            bounds,
        }
    }

    pub fn feature(name: impl Into<String>, id: ContentId) -> Self {
        Node::new(name, NodeKind::Feature, id, None, None)
    }

    pub fn tree(name: impl Into<String>, id: ContentId) -> Self {
        Node::new(name, NodeKind::Tree, id, None, None)
    }

    pub fn with_bounds(mut self, bounds: Envelope) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_metadata(mut self, metadata_id: ContentId) -> Self {
        self.metadata_id = Some(metadata_id).filter(|m| !m.is_null());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    pub fn metadata_id(&self) -> Option<&ContentId> {
        self.metadata_id.as_ref()
    }

    pub fn bounds(&self) -> Option<&Envelope> {
        self.bounds.as_ref()
    }

    pub fn is_tree(&self) -> bool {
        self.kind == NodeKind::Tree
    }

    /// Reject nodes that cannot be stored in a tree.
    pub(crate) fn validate(&self) -> Result<(), TreeError> {
        if self.name.is_empty() {
            return Err(TreeError::InvalidArgument("node name can't be empty".to_string()));
        }
        if self.id.is_null() {
            return Err(TreeError::InvalidArgument(format!(
                "node {:?} has a NULL object id",
                self.name
            )));
        }
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.id == other.id
            && self.metadata_id == other.metadata_id
    }
}

impl Eq for Node {}

/// Anonymous pointer to a bucket subtree.
///
/// Equality ignores `bounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    index: u32,
    id: ContentId,
    bounds: Option<Envelope>,
}

impl Bucket {
    pub fn new(index: u32, id: ContentId, bounds: Option<Envelope>) -> Self {
        Bucket { index, id, bounds }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    pub fn bounds(&self) -> Option<&Envelope> {
        self.bounds.as_ref()
    }
}

impl PartialEq for Bucket {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.id == other.id
    }
}

impl Eq for Bucket {}
