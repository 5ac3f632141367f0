//! Error types for the revision tree engine.

use crate::types::ContentId;
use thiserror::Error;

/// Errors raised by object store implementations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object is stored under the requested id
    #[error("Object not found: {0}")]
    NotFound(ContentId),

    /// Malformed request (bad hex, partial id too short, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The stored object is not of the requested kind
    #[error("Object {id} is not a {expected}")]
    TypeMismatch { id: ContentId, expected: &'static str },

    /// Encoding or decoding of a stored object failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend reported an I/O failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Errors raised while building or reading revision trees.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Rejected node, key or parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A bucket strategy was asked for a depth it cannot partition
    #[error("depth too deep: {depth} (max {max})")]
    TooDeep { depth: u32, max: u32 },

    /// An internal tree invariant did not hold; the build must be discarded
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// The object store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The writer thread backing a `TreeWriter` is gone
    #[error("Tree writer closed")]
    WriterClosed,
}

/// Errors raised by the configuration and logging surface.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
