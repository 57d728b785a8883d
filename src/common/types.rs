//! Shared types used across the application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::BridgeError;

/// A supported chat platform.
///
/// The set is closed: the persisted schema constrains platform columns to
/// these tags, and adapters register under exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    Telegram,
}

impl Platform {
    /// All known platforms.
    pub const ALL: [Platform; 2] = [Platform::Discord, Platform::Telegram];

    /// Lowercase tag used in storage and commands.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Telegram => "telegram",
        }
    }

    /// Bracketed prefix shown in front of relayed usernames.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Discord => "[DISCORD]",
            Self::Telegram => "[TELEGRAM]",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discord" => Ok(Self::Discord),
            "telegram" => Ok(Self::Telegram),
            other => Err(BridgeError::UnknownPlatform {
                platform: other.to_string(),
            }),
        }
    }
}

/// Kind of platform channel a room mapping points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    #[default]
    Channel,
    Group,
    Dm,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Dm => "dm",
        }
    }

    /// Parse a stored kind. Unknown values fall back to `Channel`.
    pub fn from_db(s: &str) -> Self {
        match s {
            "group" => Self::Group,
            "dm" | "direct" => Self::Dm,
            _ => Self::Channel,
        }
    }
}

/// Type of content carried by a bridged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Audio,
    Video,
    Sticker,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Sticker => "sticker",
        }
    }
}
