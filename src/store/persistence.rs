//! Sled-backed object store
//!
//! Objects are bincode-encoded [`RevObject`] values keyed by the raw id bytes.

use super::{ObjectStore, PartialId};
use crate::error::StorageError;
use crate::tree::revtree::RevObject;
use crate::types::ContentId;
use std::path::Path;
use tracing::debug;

/// Persistent object store on top of a sled database.
#[derive(Clone)]
pub struct SledObjectStore {
    db: sled::Db,
}

impl SledObjectStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Backend(format!(
                "failed to create store directory {}: {}",
                path.display(),
                e
            ))
        })?;
        let db = sled::open(path)?;
        debug!(path = %path.display(), "opened sled object store");
        Ok(Self { db })
    }

    /// A store that is deleted when dropped.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<usize, StorageError> {
        Ok(self.db.flush()?)
    }

    fn decode(raw: &[u8]) -> Result<RevObject, StorageError> {
        Ok(bincode::deserialize(raw)?)
    }
}

impl ObjectStore for SledObjectStore {
    fn exists(&self, id: &ContentId) -> Result<bool, StorageError> {
        Ok(self.db.contains_key(id.as_bytes())?)
    }

    fn get_if_present(&self, id: &ContentId) -> Result<Option<RevObject>, StorageError> {
        match self.db.get(id.as_bytes())? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn put(&self, object: RevObject) -> Result<bool, StorageError> {
        let encoded = bincode::serialize(&object)?;
        let swapped =
            self.db
                .compare_and_swap(object.id().as_bytes(), None as Option<&[u8]>, Some(encoded))?;
        Ok(swapped.is_ok())
    }

    fn delete(&self, id: &ContentId) -> Result<bool, StorageError> {
        Ok(self.db.remove(id.as_bytes())?.is_some())
    }

    fn lookup(&self, partial: &str) -> Result<Vec<ContentId>, StorageError> {
        let partial = PartialId::parse(partial)?;
        let mut matches = Vec::new();
        for entry in self.db.scan_prefix(partial.prefix()) {
            let (key, _) = entry?;
            let id = ContentId::from_slice(&key)?;
            if partial.matches(&id) {
                matches.push(id);
            }
        }
        Ok(matches)
    }
}
