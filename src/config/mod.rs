//! Engine configuration
//!
//! Layered loading through the `config` crate: built-in defaults, then an
//! optional TOML file, then `REVTREE__SECTION__KEY` environment variables.

pub mod facade;

pub mod merge {
    pub mod service;
}

pub mod sources {
    pub mod environment;
    pub mod file;
}

pub mod paths {
    pub mod xdg_root;
}

pub use facade::ConfigLoader;

use crate::error::{ApiError, TreeError};
use crate::logging::LoggingConfig;
use crate::store::{MemoryObjectStore, ObjectStore, SledObjectStore};
use crate::tree::envelope::Envelope;
use crate::tree::pending::DEFAULT_PENDING_WRITES_THRESHOLD;
use crate::tree::quad::{QuadOrder, QuadOverflow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Staged-change count at which `put` normalizes eagerly.
pub const DEFAULT_NORMALIZATION_THRESHOLD: usize = 1_000_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub builder: BuilderSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub quad: QuadSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tuning knobs for [`TreeBuilder`](crate::tree::TreeBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderSettings {
    /// Bucket trees held in memory before a bulk flush to the store
    #[serde(default = "default_pending_writes_threshold")]
    pub pending_writes_threshold: usize,

    /// Staged changes that trigger an intermediate normalization
    #[serde(default = "default_normalization_threshold")]
    pub normalization_threshold: usize,
}

fn default_pending_writes_threshold() -> usize {
    DEFAULT_PENDING_WRITES_THRESHOLD
}

fn default_normalization_threshold() -> usize {
    DEFAULT_NORMALIZATION_THRESHOLD
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            pending_writes_threshold: default_pending_writes_threshold(),
            normalization_threshold: default_normalization_threshold(),
        }
    }
}

/// Object store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database directory for the sled backend. Defaults to
    /// `$XDG_DATA_HOME/revtree/objects`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open(&self) -> Result<Arc<dyn ObjectStore>, ApiError> {
        match self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryObjectStore::new())),
            StorageBackend::Sled => {
                let path = match &self.path {
                    Some(path) => path.clone(),
                    None => paths::xdg_root::default_store_dir()?,
                };
                Ok(Arc::new(SledObjectStore::open(&path)?))
            }
        }
    }
}

/// Parameters of the spatial bucket order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadSettings {
    /// `[min_x, min_y, max_x, max_y]`
    #[serde(default = "default_max_bounds")]
    pub max_bounds: [f64; 4],

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default)]
    pub overflow: QuadOverflow,
}

fn default_max_bounds() -> [f64; 4] {
    [-180.0, -90.0, 180.0, 90.0]
}

fn default_max_depth() -> u32 {
    12
}

impl Default for QuadSettings {
    fn default() -> Self {
        Self {
            max_bounds: default_max_bounds(),
            max_depth: default_max_depth(),
            overflow: QuadOverflow::default(),
        }
    }
}

impl QuadSettings {
    /// Build the quad order these settings describe.
    pub fn order(&self) -> Result<QuadOrder, TreeError> {
        let [min_x, min_y, max_x, max_y] = self.max_bounds;
        if min_x > max_x || min_y > max_y {
            return Err(TreeError::InvalidArgument(format!(
                "quad max_bounds must be [min_x, min_y, max_x, max_y], got {:?}",
                self.max_bounds
            )));
        }
        let bounds = Envelope::new(min_x, min_y, max_x, max_y);
        Ok(QuadOrder::new(bounds, self.max_depth)?.with_overflow(self.overflow))
    }
}
