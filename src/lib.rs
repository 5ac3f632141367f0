//! Revtree: Content-Addressed Revision Trees
//!
//! Immutable, deterministically hashed trees for versioning large collections
//! of features. Trees stay flat while small and shard into buckets as they
//! grow, either by name hash or by spatial quadrant, and a [`TreeBuilder`]
//! amends them incrementally by rewriting only the buckets a change touches.

pub mod concurrency;
pub mod config;
pub mod copy;
pub mod error;
pub mod logging;
pub mod store;
pub mod tree;
pub mod types;

pub use concurrency::TreeWriter;
pub use config::{ConfigLoader, EngineConfig};
pub use copy::{copy_trees, CopyReport};
pub use error::{ApiError, StorageError, TreeError};
pub use store::{MemoryObjectStore, ObjectStore, SledObjectStore};
pub use tree::{BucketOrder, Node, NodeKind, RevTree, TreeBuilder};
pub use types::ContentId;
