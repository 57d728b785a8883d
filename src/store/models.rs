//! Persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::types::{ChannelKind, Platform};

/// Default per-room message length limit.
pub const DEFAULT_MAX_MESSAGE_LENGTH: u32 = 4000;

/// A bridged conversation, independent of any platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binding of one platform channel to a room.
///
/// `(platform, platform_channel_id)` is unique across all rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMapping {
    pub id: i64,
    pub room_id: i64,
    pub platform: Platform,
    pub platform_channel_id: String,
    pub label: String,
    pub kind: ChannelKind,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-room bridge policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub id: i64,
    pub room_id: i64,
    pub is_active: bool,
    pub allow_media: bool,
    pub allow_edits: bool,
    pub allow_deletes: bool,
    pub filter_words: Vec<String>,
    pub max_message_length: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A platform channel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    pub platform: Platform,
    pub channel_id: String,
}

impl ChannelRef {
    pub fn new(platform: Platform, channel_id: impl Into<String>) -> Self {
        Self {
            platform,
            channel_id: channel_id.into(),
        }
    }

    /// Label stored alongside the mapping.
    pub fn label(&self) -> String {
        format!("{}_{}", self.platform, self.channel_id)
    }
}

/// Result of persisting a bridge: the room, its policy, and every active
/// member mapping after the write committed.
#[derive(Debug, Clone)]
pub struct PersistedBridge {
    pub room: Room,
    pub config: BridgeConfig,
    pub members: Vec<RoomMapping>,
}

/// Name given to a room created for a fresh channel pair.
pub fn room_name(source: &ChannelRef, target: &ChannelRef) -> String {
    format!(
        "bridge_{}_{}_{}_{}",
        source.platform, source.channel_id, target.platform, target.channel_id
    )
}
