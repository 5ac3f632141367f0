//! Pending writes arena
//!
//! Bucket trees built during normalization are parked here instead of being
//! written one by one. The arena is owned by the root builder and lent to the
//! recursive normalization by mutable reference; only the root flushes it.

use crate::error::StorageError;
use crate::store::{CountingListener, ObjectStore};
use crate::tree::revtree::{RevObject, RevTree};
use crate::types::ContentId;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Flush size used when none is configured.
pub const DEFAULT_PENDING_WRITES_THRESHOLD: usize = 10_000;

/// Not-yet-persisted trees keyed by id.
#[derive(Debug)]
pub struct PendingWrites {
    trees: BTreeMap<ContentId, RevTree>,
    threshold: usize,
}

impl PendingWrites {
    pub fn new(threshold: usize) -> Self {
        Self {
            trees: BTreeMap::new(),
            threshold: threshold.max(1),
        }
    }

    pub fn insert(&mut self, tree: RevTree) {
        self.trees.insert(*tree.id(), tree);
    }

    pub fn remove(&mut self, id: &ContentId) -> Option<RevTree> {
        self.trees.remove(id)
    }

    pub fn get(&self, id: &ContentId) -> Option<&RevTree> {
        self.trees.get(id)
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.trees.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_full(&self) -> bool {
        self.trees.len() >= self.threshold
    }

    /// A tree from the arena, falling back to the store.
    pub fn resolve(&self, store: &dyn ObjectStore, id: &ContentId) -> Result<RevTree, StorageError> {
        match self.trees.get(id) {
            Some(tree) => Ok(tree.clone()),
            None => store.get_tree(id),
        }
    }

    /// Write every parked tree with one bulk put and empty the arena.
    ///
    /// Returns the number of trees the store did not already hold.
    pub fn flush(&mut self, store: &dyn ObjectStore) -> Result<usize, StorageError> {
        if self.trees.is_empty() {
            return Ok(0);
        }
        let started = Instant::now();
        let parked = self.trees.len();
        let trees = std::mem::take(&mut self.trees);
        let mut listener = CountingListener::default();
        let mut objects = trees.into_values().map(RevObject::Tree);
        let inserted = store.put_all(&mut objects, &mut listener)?;
        debug!(
            parked,
            inserted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "flushed pending trees"
        );
        Ok(inserted)
    }

    pub fn clear(&mut self) {
        self.trees.clear();
    }
}

impl Default for PendingWrites {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_WRITES_THRESHOLD)
    }
}
