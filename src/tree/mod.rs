//! Revision Trees
//!
//! Immutable, content-addressed snapshots of large collections, and the
//! builder that amends them. A tree is flat while its entries fit the bucket
//! order's size limit and sharded into bucket subtrees beyond it.

pub mod builder;
pub mod diff;
pub mod envelope;
pub mod hasher;
pub mod node;
pub mod order;
pub mod pending;
pub mod quad;
pub mod revtree;
pub mod walk;

pub use builder::TreeBuilder;
pub use diff::{diff, DiffEntry};
pub use envelope::Envelope;
pub use node::{Bucket, Node, NodeKind};
pub use order::BucketOrder;
pub use pending::PendingWrites;
pub use quad::{QuadOrder, QuadOverflow, Quadrant};
pub use revtree::{empty_tree_id, RevFeature, RevObject, RevTree};
pub use walk::{walk, TreeWalk, WalkEntry, WalkStrategy};
