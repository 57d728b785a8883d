//! Durable storage for rooms, room mappings and per-room bridge config.
//!
//! The store is the only durable owner of these records. The in-memory
//! connection graph is rebuilt from `get_all_active_bridged_mappings` at
//! startup.

pub mod models;
pub mod sqlite;

use std::collections::BTreeMap;

use crate::common::error::StoreResult;
use crate::common::types::{ChannelKind, Platform};

pub use models::{BridgeConfig, ChannelRef, PersistedBridge, Room, RoomMapping};
pub use sqlite::SqliteStore;

/// Persistence surface consumed by the bridge core.
///
/// All calls are blocking. Callers on the async runtime go through
/// `tokio::task::spawn_blocking`.
pub trait RoomStore: Send + Sync {
    /// Return the room with this name, creating it if absent.
    fn create_or_get_room(&self, name: &str) -> StoreResult<Room>;

    /// Upsert the mapping for `(platform, channel_id)`.
    ///
    /// An existing mapping is reactivated and moved to `room_id` with the
    /// new label and kind.
    fn create_or_get_room_mapping(
        &self,
        room_id: i64,
        platform: Platform,
        channel_id: &str,
        label: &str,
        kind: ChannelKind,
    ) -> StoreResult<RoomMapping>;

    /// Active mapping for a platform channel, if any.
    fn get_room_mapping_by_platform_channel(
        &self,
        platform: Platform,
        channel_id: &str,
    ) -> StoreResult<Option<RoomMapping>>;

    /// Active mappings belonging to a room.
    fn get_active_room_mappings(&self, room_id: i64) -> StoreResult<Vec<RoomMapping>>;

    /// Deactivate every mapping of `platform` in the room. Returns the
    /// number of rows changed.
    fn deactivate_room_mapping(&self, room_id: i64, platform: Platform) -> StoreResult<usize>;

    /// Return the room's config, creating it with defaults if absent.
    fn create_or_get_bridge_config(&self, room_id: i64) -> StoreResult<BridgeConfig>;

    /// Overwrite the mutable fields of a room's config.
    fn update_bridge_config(&self, config: &BridgeConfig) -> StoreResult<()>;

    /// Active mappings grouped by room, restricted to rooms whose config
    /// is active. Ordering is deterministic.
    fn get_all_active_bridged_mappings(&self) -> StoreResult<BTreeMap<i64, Vec<RoomMapping>>>;

    /// Persist both ends of a bridge in one transaction.
    ///
    /// Joins the room already holding an active mapping for `source` (or
    /// else `target`), otherwise creates a new room. Both mappings and the
    /// room config end up active.
    fn persist_bridge(&self, source: &ChannelRef, target: &ChannelRef)
        -> StoreResult<PersistedBridge>;
}
