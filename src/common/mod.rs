//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod types;

pub use messages::BridgeMessage;
