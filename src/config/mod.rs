//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::warn;

use crate::common::error::ConfigError;

pub use parser::load_config;
pub use types::*;
pub use validate::validate_config;

/// Load the config file, apply environment overrides and validate.
///
/// A missing file is not an error: defaults are used.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config = if path.exists() {
        load_config(path)?
    } else {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        Config::default()
    };

    let config = env::apply_env_overrides(config);
    validate_config(&config)?;
    Ok(config)
}
