//! Environment variable source: REVTREE__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add environment variable overlay to builder.
/// `REVTREE__QUAD__MAX_DEPTH=16` sets `quad.max_depth`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("REVTREE")
            .separator("__")
            .try_parsing(true),
    )
}
