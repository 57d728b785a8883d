//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

use crate::store::models::DEFAULT_MAX_MESSAGE_LENGTH;

/// Default database location.
pub const DEFAULT_DATABASE_PATH: &str = "./data/bridge.db";

/// Root configuration structure. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bridge: BridgeSettings,
    pub filters: FiltersConfig,
    pub admin: AdminConfig,
}

/// SQLite database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}

/// Fan-out and lifecycle tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Upper bound for a single send to a platform.
    pub delivery_timeout_secs: u64,
    /// How long shutdown waits for in-flight fan-outs.
    pub shutdown_timeout_secs: u64,
    /// Content longer than this (in bytes) is delivered in chunks.
    pub max_message_length: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: 10,
            shutdown_timeout_secs: 5,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH as usize,
        }
    }
}

impl BridgeSettings {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Content filter patterns applied to every inbound message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    pub enabled: bool,
    pub patterns: Vec<String>,
}

/// Users allowed to run `!bridge create` and `!bridge remove`.
///
/// Entries are platform user ids, optionally qualified with the platform
/// (`telegram:12345`). An empty list disables those commands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub users: Vec<String>,
}
