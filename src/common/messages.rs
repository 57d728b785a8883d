//! Canonical message type for bridge communication.
//!
//! Adapters normalize every inbound platform event into a `BridgeMessage`.
//! The bridge consumes it once during fan-out and then drops it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::types::{MessageKind, Platform};

/// A normalized chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Message identifier (platform-native when available).
    pub id: String,
    /// Platform the message originated from.
    pub source_platform: Platform,
    /// Platform-native channel id the message was posted in.
    pub source_channel_id: String,
    /// Platform-native id of the sender.
    pub source_user_id: String,
    /// Display name supplied by the adapter. May be empty.
    pub username: String,
    /// Text content.
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    /// Attachment URLs or platform file references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// Sender avatar, used by rich delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl BridgeMessage {
    /// Create a text message with a generated id.
    pub fn text(
        source_platform: Platform,
        source_channel_id: impl Into<String>,
        source_user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let source_channel_id = source_channel_id.into();
        let timestamp = Utc::now();
        Self {
            id: format!(
                "{}_{}_{}",
                source_platform,
                source_channel_id,
                timestamp.timestamp_millis()
            ),
            source_platform,
            source_channel_id,
            source_user_id: source_user_id.into(),
            username: String::new(),
            content: content.into(),
            kind: MessageKind::Text,
            timestamp,
            attachments: Vec::new(),
            avatar_url: None,
        }
    }

    /// Set the sender display name.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the message kind.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a file or media reference.
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    /// Set the sender avatar.
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Content with attachment references appended, space separated.
    pub fn full_content(&self) -> String {
        let mut full = self.content.clone();
        for attachment in &self.attachments {
            if !full.is_empty() {
                full.push(' ');
            }
            full.push_str(attachment);
        }
        full
    }
}
