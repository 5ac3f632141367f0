//! Core types for the revision tree engine.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in a [`ContentId`].
pub const ID_BYTES: usize = 20;

/// Minimum number of hex characters accepted by partial id lookups.
pub const MIN_PARTIAL_ID_CHARS: usize = 8;

/// ContentId: digest identifying an immutable object by its canonical content.
///
/// Equality and ordering are plain byte comparisons.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ContentId([u8; ID_BYTES]);

impl ContentId {
    /// The distinguished "absent" id.
    pub const NULL: ContentId = ContentId([0u8; ID_BYTES]);

    pub const fn from_bytes(raw: [u8; ID_BYTES]) -> Self {
        ContentId(raw)
    }

    /// Build an id from a slice; the slice must be exactly [`ID_BYTES`] long.
    pub fn from_slice(raw: &[u8]) -> Result<Self, StorageError> {
        let bytes: [u8; ID_BYTES] = raw.try_into().map_err(|_| {
            StorageError::InvalidArgument(format!(
                "expected {} id bytes, got {}",
                ID_BYTES,
                raw.len()
            ))
        })?;
        Ok(ContentId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ID_BYTES]
    }

    /// Full lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex form used in log output.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

impl FromStr for ContentId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s)
            .map_err(|e| StorageError::InvalidArgument(format!("invalid content id {s:?}: {e}")))?;
        ContentId::from_slice(&raw)
    }
}
