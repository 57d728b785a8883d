//! Message formatting for relayed text.
//!
//! Handles placeholder substitution in message format strings.
//! Supports placeholders: %platform, %user, %message, %time

use chrono::Local;

use crate::common::types::Platform;
use crate::common::BridgeMessage;

/// Default format for messages delivered to Discord.
pub const DEFAULT_DISCORD_FORMAT: &str = "%platform **%user**: %message";

/// Default format for messages delivered to Telegram. The user label is
/// rendered as an `@` mention.
pub const DEFAULT_TELEGRAM_FORMAT: &str = "%platform %user: %message";

/// Tag used in rich display names for senders not from Telegram.
pub const BRIDGE_TAG: &str = "[BRIDGE]";

/// Name shown when a sender has no usable display name.
pub const ANONYMOUS: &str = "Anonymous";

/// User label for plain-text formats when the sender has no name.
const ANONYMOUS_LABEL: &str = "anonymous";

/// Recognized placeholders, without the leading `%`.
const PLACEHOLDERS: [&str; 4] = ["platform", "message", "user", "time"];

/// How `%user` is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserStyle {
    /// Name as given.
    #[default]
    Plain,
    /// Name prefixed with `@` unless it already is.
    Mention,
}

/// Message formatter that substitutes placeholders in format strings.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    format: String,
    user_style: UserStyle,
}

impl MessageFormatter {
    /// Create a new formatter with the given format string.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            user_style: UserStyle::Plain,
        }
    }

    pub fn with_user_style(mut self, user_style: UserStyle) -> Self {
        self.user_style = user_style;
        self
    }

    /// Default formatter for text delivered to `target`.
    pub fn for_platform(target: Platform) -> Self {
        match target {
            Platform::Discord => Self::new(DEFAULT_DISCORD_FORMAT),
            Platform::Telegram => {
                Self::new(DEFAULT_TELEGRAM_FORMAT).with_user_style(UserStyle::Mention)
            }
        }
    }

    /// Format a message with the given context.
    ///
    /// Substitutes the following placeholders:
    /// - `%platform` - Source platform tag, e.g. `[TELEGRAM]`
    /// - `%user` - Sender display name
    /// - `%message` - The actual message content
    /// - `%time` - Current local time (HH:MM:SS)
    ///
    /// The format string is scanned once; substituted values are never
    /// scanned for placeholders. Unknown `%` sequences are kept as is.
    pub fn format(&self, ctx: &FormatContext) -> String {
        let mut out = String::with_capacity(self.format.len() + ctx.message.len());
        let mut rest = self.format.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            match PLACEHOLDERS.iter().find(|name| after.starts_with(*name)) {
                Some(name) => {
                    match *name {
                        "platform" => out.push_str(ctx.source.tag()),
                        "message" => out.push_str(&ctx.message),
                        "user" => out.push_str(&self.user_label(&ctx.user)),
                        _ => out.push_str(&get_time()),
                    }
                    rest = &after[name.len()..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn user_label(&self, user: &str) -> String {
        let user = user.trim();
        match self.user_style {
            UserStyle::Plain if user.is_empty() => ANONYMOUS_LABEL.to_string(),
            UserStyle::Plain => user.to_string(),
            UserStyle::Mention if user.is_empty() || user == "@" => {
                format!("@{}", ANONYMOUS_LABEL)
            }
            UserStyle::Mention if user.starts_with('@') => user.to_string(),
            UserStyle::Mention => format!("@{}", user),
        }
    }
}

/// Context for message formatting.
#[derive(Debug, Clone)]
pub struct FormatContext {
    /// Platform the message came from.
    pub source: Platform,
    /// The sender's display name.
    pub user: String,
    /// The message content.
    pub message: String,
}

impl FormatContext {
    pub fn new(source: Platform, user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source,
            user: user.into(),
            message: message.into(),
        }
    }

    /// Build a context from a bridged message, attachments included.
    pub fn from_message(msg: &BridgeMessage) -> Self {
        Self::new(msg.source_platform, &msg.username, msg.full_content())
    }
}

/// Display name used for rich delivery, e.g. `[TELEGRAM] alice`.
///
/// Leading `@` is stripped and an empty name becomes `Anonymous`.
pub fn rich_display_name(source: Platform, username: &str) -> String {
    let name = username.trim().trim_start_matches('@');
    let name = if name.is_empty() { ANONYMOUS } else { name };
    let tag = match source {
        Platform::Telegram => Platform::Telegram.tag(),
        _ => BRIDGE_TAG,
    };
    format!("{} {}", tag, name)
}

/// Get the current time as HH:MM:SS string.
fn get_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Find the last UTF-8 char boundary at or before `byte_index` in `s`.
fn floor_char_boundary(s: &str, byte_index: usize) -> usize {
    if byte_index >= s.len() {
        return s.len();
    }
    let mut i = byte_index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split a message into chunks of at most `max_len` bytes.
///
/// Splits on the last space inside the limit when there is one, otherwise
/// hard-splits at a char boundary. Never cuts a multi-byte character.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        remaining = remaining.trim_start();
        if remaining.is_empty() {
            break;
        }

        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let split_at = floor_char_boundary(remaining, max_len);

        // A limit narrower than the first char still has to make progress.
        if split_at == 0 {
            let first_char_end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
            chunks.push(remaining[..first_char_end].to_string());
            remaining = &remaining[first_char_end..];
            continue;
        }

        let chunk = &remaining[..split_at];
        match chunk.rfind(' ') {
            Some(space_idx) if space_idx > 0 => {
                chunks.push(remaining[..space_idx].to_string());
                remaining = &remaining[space_idx + 1..];
            }
            _ => {
                chunks.push(chunk.to_string());
                remaining = &remaining[split_at..];
            }
        }
    }

    chunks
}
