//! Object Store
//!
//! Content-addressed persistence boundary consumed by the tree builder and
//! traversal code. Objects are keyed by [`ContentId`] and are immutable, so a
//! store never overwrites an existing entry.

pub mod memory;
pub mod persistence;

pub use memory::MemoryObjectStore;
pub use persistence::SledObjectStore;

use crate::error::StorageError;
use crate::tree::revtree::{empty_tree_id, RevFeature, RevObject, RevTree};
use crate::types::{ContentId, ID_BYTES, MIN_PARTIAL_ID_CHARS};

/// Per-object callbacks for bulk operations.
pub trait BulkOpListener {
    fn found(&mut self, _id: &ContentId) {}

    fn not_found(&mut self, _id: &ContentId) {}

    /// Called only for objects the store did not already hold.
    fn inserted(&mut self, _id: &ContentId) {}
}

/// Listener that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl BulkOpListener for NoopListener {}

/// Listener that counts callbacks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountingListener {
    pub found: usize,
    pub not_found: usize,
    pub inserted: usize,
}

impl BulkOpListener for CountingListener {
    fn found(&mut self, _id: &ContentId) {
        self.found += 1;
    }

    fn not_found(&mut self, _id: &ContentId) {
        self.not_found += 1;
    }

    fn inserted(&mut self, _id: &ContentId) {
        self.inserted += 1;
    }
}

/// Object Store interface
///
/// Implementations must be safe to share between threads; the builder never
/// assumes exclusive access.
pub trait ObjectStore: Send + Sync {
    fn exists(&self, id: &ContentId) -> Result<bool, StorageError>;

    fn get_if_present(&self, id: &ContentId) -> Result<Option<RevObject>, StorageError>;

    /// Store `object` unless it is already present. Returns true if inserted.
    fn put(&self, object: RevObject) -> Result<bool, StorageError>;

    /// Remove an object. Returns true if it was present.
    fn delete(&self, id: &ContentId) -> Result<bool, StorageError>;

    /// Every stored id whose hex form starts with `partial`.
    fn lookup(&self, partial: &str) -> Result<Vec<ContentId>, StorageError>;

    fn get(&self, id: &ContentId) -> Result<RevObject, StorageError> {
        self.get_if_present(id)?
            .ok_or(StorageError::NotFound(*id))
    }

    /// Fetch a tree. The canonical empty tree resolves even when it was never
    /// stored.
    fn get_tree(&self, id: &ContentId) -> Result<RevTree, StorageError> {
        match self.get_if_present(id)? {
            Some(RevObject::Tree(tree)) => Ok(tree),
            Some(_) => Err(StorageError::TypeMismatch {
                id: *id,
                expected: "tree",
            }),
            None if *id == empty_tree_id() => Ok(RevTree::empty()),
            None => Err(StorageError::NotFound(*id)),
        }
    }

    fn get_feature(&self, id: &ContentId) -> Result<RevFeature, StorageError> {
        match self.get(id)? {
            RevObject::Feature(feature) => Ok(feature),
            RevObject::Tree(_) => Err(StorageError::TypeMismatch {
                id: *id,
                expected: "feature",
            }),
        }
    }

    /// Lazy bulk fetch. Each id is read as the iterator reaches it; missing
    /// ids are reported to the listener and skipped.
    fn get_all<'a>(
        &'a self,
        ids: &'a [ContentId],
        listener: &'a mut dyn BulkOpListener,
    ) -> Box<dyn Iterator<Item = Result<RevObject, StorageError>> + 'a> {
        Box::new(ids.iter().filter_map(move |id| match self.get_if_present(id) {
            Ok(Some(object)) => {
                listener.found(id);
                Some(Ok(object))
            }
            Ok(None) => {
                listener.not_found(id);
                None
            }
            Err(err) => Some(Err(err)),
        }))
    }

    /// Bulk insert. Objects already present are skipped silently.
    fn put_all(
        &self,
        objects: &mut dyn Iterator<Item = RevObject>,
        listener: &mut dyn BulkOpListener,
    ) -> Result<usize, StorageError> {
        let mut inserted = 0;
        for object in objects {
            let id = *object.id();
            if self.put(object)? {
                listener.inserted(&id);
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

/// A validated partial id: the raw bytes of its even-length prefix plus the
/// lowercase hex text used to filter odd-length prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialId {
    prefix: Vec<u8>,
    text: String,
}

impl PartialId {
    pub fn parse(partial: &str) -> Result<Self, StorageError> {
        if partial.len() < MIN_PARTIAL_ID_CHARS {
            return Err(StorageError::InvalidArgument(format!(
                "partial id {:?} must have at least {} characters",
                partial, MIN_PARTIAL_ID_CHARS
            )));
        }
        if partial.len() > ID_BYTES * 2 {
            return Err(StorageError::InvalidArgument(format!(
                "partial id {:?} is longer than a full id",
                partial
            )));
        }
        if !partial.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidArgument(format!(
                "invalid partial id {:?}",
                partial
            )));
        }
        let text = partial.to_ascii_lowercase();
        let even = &text[..text.len() - text.len() % 2];
        let prefix = hex::decode(even).map_err(|e| {
            StorageError::InvalidArgument(format!("invalid partial id {:?}: {}", partial, e))
        })?;
        Ok(PartialId { prefix, text })
    }

    /// Raw bytes usable for a byte-prefix scan.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn matches(&self, id: &ContentId) -> bool {
        id.to_hex().starts_with(&self.text)
    }
}
