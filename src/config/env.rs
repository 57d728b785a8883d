//! Environment variable overrides for configuration.
//!
//! - `CROSSBRIDGE_CONFIG` - config file path
//! - `CROSSBRIDGE_DATABASE_PATH` (or legacy `DATABASE_PATH`) - SQLite file
//! - `CROSSBRIDGE_DELIVERY_TIMEOUT_SECS` - per-send timeout
//! - `CROSSBRIDGE_MAX_MESSAGE_LENGTH` - chunking threshold
//! - `CROSSBRIDGE_ADMIN_USERS` - comma-separated admin user ids

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "CROSSBRIDGE";

/// Default config file name.
pub const DEFAULT_CONFIG_PATH: &str = "crossbridge.conf";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| env::var(key).ok())
}

/// Apply overrides using `lookup` to read variables.
pub fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name)).filter(|v| !v.is_empty());

    if let Some(path) = var("DATABASE_PATH").or_else(|| lookup("DATABASE_PATH")) {
        if !path.is_empty() {
            config.database.path = path;
        }
    }

    if let Some(raw) = var("DELIVERY_TIMEOUT_SECS") {
        match raw.parse() {
            Ok(secs) => config.bridge.delivery_timeout_secs = secs,
            Err(_) => warn!("Ignoring {}_DELIVERY_TIMEOUT_SECS={:?}: not a number", ENV_PREFIX, raw),
        }
    }

    if let Some(raw) = var("MAX_MESSAGE_LENGTH") {
        match raw.parse() {
            Ok(len) => config.bridge.max_message_length = len,
            Err(_) => warn!("Ignoring {}_MAX_MESSAGE_LENGTH={:?}: not a number", ENV_PREFIX, raw),
        }
    }

    if let Some(raw) = var("ADMIN_USERS") {
        config.admin.users = raw
            .split(',')
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(str::to_string)
            .collect();
    }

    config
}

/// Get the config file path from environment or use default.
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
