//! MergeService: orchestrates sources and deserializes to EngineConfig.

use crate::config::sources::{environment, file};
use crate::config::EngineConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from standard sources.
    /// Precedence: defaults (lowest) -> user config file -> environment (highest).
    pub fn load() -> Result<EngineConfig, ConfigError> {
        let builder = file::add_default_to_builder(Config::builder());
        Self::finish(environment::add_to_builder(builder))
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<EngineConfig, ConfigError> {
        let builder = file::add_to_builder(Config::builder(), path);
        Self::finish(environment::add_to_builder(builder))
    }

    // Missing keys fall back to the serde defaults on EngineConfig.
    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<EngineConfig, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
