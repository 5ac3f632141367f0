//! In-memory object store.

use super::{ObjectStore, PartialId};
use crate::error::StorageError;
use crate::tree::revtree::RevObject;
use crate::types::ContentId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Object store backed by an ordered map behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<ContentId, RevObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Ids of every stored object, in byte order.
    pub fn ids(&self) -> Vec<ContentId> {
        self.objects.read().keys().copied().collect()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn exists(&self, id: &ContentId) -> Result<bool, StorageError> {
        Ok(self.objects.read().contains_key(id))
    }

    fn get_if_present(&self, id: &ContentId) -> Result<Option<RevObject>, StorageError> {
        Ok(self.objects.read().get(id).cloned())
    }

    fn put(&self, object: RevObject) -> Result<bool, StorageError> {
        let mut objects = self.objects.write();
        if objects.contains_key(object.id()) {
            return Ok(false);
        }
        objects.insert(*object.id(), object);
        Ok(true)
    }

    fn delete(&self, id: &ContentId) -> Result<bool, StorageError> {
        Ok(self.objects.write().remove(id).is_some())
    }

    fn lookup(&self, partial: &str) -> Result<Vec<ContentId>, StorageError> {
        let partial = PartialId::parse(partial)?;
        let mut start = [0u8; crate::types::ID_BYTES];
        start[..partial.prefix().len()].copy_from_slice(partial.prefix());
        let start = ContentId::from_bytes(start);

        let objects = self.objects.read();
        Ok(objects
            .range((Bound::Included(start), Bound::Unbounded))
            .map(|(id, _)| *id)
            .take_while(|id| id.as_bytes().starts_with(partial.prefix()))
            .filter(|id| partial.matches(id))
            .collect())
    }
}
