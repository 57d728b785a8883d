//! Configuration validation.
//!
//! Collects every problem so the operator sees them all at once.

use fancy_regex::Regex;

use crate::common::error::ConfigError;
use crate::common::types::Platform;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.database.path.trim().is_empty() {
        errors.push("database.path is required".to_string());
    }

    if config.bridge.delivery_timeout_secs == 0 {
        errors.push("bridge.delivery_timeout_secs must be non-zero".to_string());
    }
    if config.bridge.shutdown_timeout_secs == 0 {
        errors.push("bridge.shutdown_timeout_secs must be non-zero".to_string());
    }
    if config.bridge.max_message_length == 0 {
        errors.push("bridge.max_message_length must be non-zero".to_string());
    }

    for (i, pattern) in config.filters.patterns.iter().enumerate() {
        if let Err(e) = Regex::new(pattern) {
            errors.push(format!(
                "filters.patterns[{}] is not a valid regex: '{}' ({})",
                i, pattern, e
            ));
        }
    }

    for (i, user) in config.admin.users.iter().enumerate() {
        if let Some((platform, id)) = user.split_once(':') {
            if platform.parse::<Platform>().is_err() || id.is_empty() {
                errors.push(format!(
                    "admin.users[{}] must be a user id or <platform>:<user id>: '{}'",
                    i, user
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
