//! Bridge routing engine.
//!
//! ## Module Structure
//!
//! - `graph`: in-memory connection graph (`ConnectionGraph`, `BridgeConnection`)
//! - `core`: adapter registry, bridge lifecycle and fan-out (`BridgeCore`)
//! - `filter`: regex content filter applied before fan-out
//! - `dispatcher`: inbound message pump with graceful drain
//! - `commands`: `!bridge` admin commands

pub mod commands;
pub mod core;
pub mod dispatcher;
pub mod filter;
pub mod graph;

pub use self::core::{BridgeCore, BridgeOptions};
pub use commands::AdminList;
pub use dispatcher::Dispatcher;
