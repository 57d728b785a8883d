//! Platform adapter boundary.
//!
//! The bridge core talks to every chat platform through [`PlatformAdapter`]
//! and never touches a platform's wire protocol. Adapters that can post
//! under a custom name and avatar also expose [`RichDelivery`].

pub mod formatter;

use async_trait::async_trait;

use crate::common::error::DeliveryError;
use crate::common::types::Platform;
use crate::common::BridgeMessage;

use formatter::{FormatContext, MessageFormatter};

/// Uniform capability surface of a connected chat platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform this adapter serves. The core registers it under this tag.
    fn platform(&self) -> Platform;

    /// Current connectivity. Checked before every delivery.
    fn is_connected(&self) -> bool;

    /// Send plain text to a platform channel.
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError>;

    /// Render a message for this platform.
    ///
    /// `msg.username` already holds the resolved display name.
    fn format_message(&self, msg: &BridgeMessage) -> String {
        MessageFormatter::for_platform(self.platform()).format(&FormatContext::from_message(msg))
    }

    /// Rich delivery capability, when the platform has one.
    fn rich_delivery(&self) -> Option<&dyn RichDelivery> {
        None
    }
}

/// Sending under a custom display name and avatar (e.g. Discord webhooks).
#[async_trait]
pub trait RichDelivery: Send + Sync {
    async fn send_rich(
        &self,
        channel_id: &str,
        content: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<(), DeliveryError>;
}
