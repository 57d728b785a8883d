//! Error types for the application.

use thiserror::Error;

use crate::common::types::Platform;

/// Errors surfaced by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Unknown platform: {platform}")]
    UnknownPlatform { platform: String },

    #[error("Bridge to {platform} not found for channel {channel_id}")]
    BridgeNotFound {
        channel_id: String,
        platform: Platform,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Delivery to {platform} channel {channel_id} failed: {source}")]
    Delivery {
        platform: Platform,
        channel_id: String,
        #[source]
        source: DeliveryError,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl BridgeError {
    pub(crate) fn unknown(platform: Platform) -> Self {
        Self::UnknownPlatform {
            platform: platform.to_string(),
        }
    }
}

/// Persistence-related errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode column '{column}': {source}")]
    Encode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create database directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store task failed: {message}")]
    Task { message: String },
}

/// Failure reported by a platform adapter while sending.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Platform not connected")]
    NotConnected,

    #[error("Send timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited")]
    RateLimited,

    #[error("Send failed: {message}")]
    SendFailed { message: String },
}

impl DeliveryError {
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed {
            message: message.into(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
