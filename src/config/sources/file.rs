//! File source: a TOML (or any format `config` recognises by extension) file.

use crate::config::paths::xdg_root;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::Path;

/// Add the user's config file, if one exists.
pub fn add_default_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match xdg_root::config_file() {
        Ok(path) => builder.add_source(File::from(path).required(false)),
        Err(_) => builder,
    }
}

/// Add an explicit config file; it must exist.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).required(true))
}
