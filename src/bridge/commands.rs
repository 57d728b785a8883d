//! Administrative chat commands (!bridge, !platforms, !help).
//!
//! Commands arrive as ordinary inbound messages. A recognized command is
//! executed against the bridge core and answered in the channel it came
//! from instead of being relayed.

use std::collections::HashSet;
use std::fmt::Write as _;

use tracing::{debug, info, warn};

use crate::common::types::Platform;
use crate::common::BridgeMessage;
use crate::config::types::AdminConfig;

use super::core::BridgeCore;

/// Longest message still considered as a command.
const MAX_COMMAND_LEN: usize = 200;

pub const HELP_TEXT: &str = "**Bridge Commands:**
• `!bridge status` - Show bridges for this channel
• `!bridge create <platform> <channel>` - Bridge this channel with another
• `!bridge remove <platform>` - Remove this channel's bridge to a platform
• `!platforms` - Show registered platforms and bridge counts
• `!help` - Show this help message";

pub const PERMISSION_DENIED: &str = "You don't have permission to use this command.";

/// Users allowed to change bridges.
///
/// Holds bare user ids, which match on any platform, and
/// `platform:user` entries, which match on that platform only.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    users: HashSet<String>,
}

impl AdminList {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let users = users
            .into_iter()
            .filter_map(|user| normalize_admin(user.as_ref()))
            .collect();
        Self { users }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(&config.users)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn allows(&self, platform: Platform, user_id: &str) -> bool {
        !user_id.is_empty()
            && (self.users.contains(user_id)
                || self.users.contains(&format!("{}:{}", platform, user_id)))
    }
}

fn normalize_admin(entry: &str) -> Option<String> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    match entry.split_once(':') {
        Some((platform, id)) => {
            let platform: Platform = platform.parse().ok()?;
            Some(format!("{}:{}", platform, id.trim()))
        }
        None => Some(entry.to_string()),
    }
}

/// A parsed admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    BridgeStatus,
    BridgeCreate {
        platform: Platform,
        channel_id: String,
    },
    BridgeRemove {
        platform: Platform,
    },
    Platforms,
    Help,
    /// Recognized command with bad arguments; carries the reply.
    Invalid {
        reply: String,
    },
}

impl AdminCommand {
    /// Commands that change bridges are restricted to admins.
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::BridgeCreate { .. } | Self::BridgeRemove { .. })
    }
}

/// Parse a message as an admin command.
///
/// Returns `None` for anything that is not a command, so it gets relayed.
pub fn parse_command(content: &str) -> Option<AdminCommand> {
    let content = content.trim();
    if content.len() > MAX_COMMAND_LEN {
        return None;
    }
    let body = content.strip_prefix('!')?;

    let mut parts = body.split_whitespace();
    let command = parts.next()?.to_lowercase();
    let args: Vec<&str> = parts.collect();

    match command.as_str() {
        "bridge" => Some(parse_bridge(&args)),
        "platforms" => Some(AdminCommand::Platforms),
        "help" => Some(AdminCommand::Help),
        _ => None,
    }
}

fn parse_bridge(args: &[&str]) -> AdminCommand {
    let Some(sub) = args.first() else {
        return invalid("Usage: `!bridge <status|create|remove>`");
    };

    match sub.to_lowercase().as_str() {
        "status" => AdminCommand::BridgeStatus,
        "create" => match (args.get(1), args.get(2)) {
            (Some(platform), Some(channel)) => match platform.parse() {
                Ok(platform) => AdminCommand::BridgeCreate {
                    platform,
                    channel_id: channel.to_string(),
                },
                Err(e) => invalid(&e.to_string()),
            },
            _ => invalid("Usage: `!bridge create <platform> <channel>`"),
        },
        "remove" => match args.get(1) {
            Some(platform) => match platform.parse() {
                Ok(platform) => AdminCommand::BridgeRemove { platform },
                Err(e) => invalid(&e.to_string()),
            },
            None => invalid("Usage: `!bridge remove <platform>`"),
        },
        other => invalid(&format!("Unknown bridge subcommand: {}", other)),
    }
}

fn invalid(reply: &str) -> AdminCommand {
    AdminCommand::Invalid {
        reply: reply.to_string(),
    }
}

/// Execute a command carried by `msg` and return the reply text.
pub async fn execute(
    core: &BridgeCore,
    admins: &AdminList,
    command: AdminCommand,
    msg: &BridgeMessage,
) -> String {
    let platform = msg.source_platform;
    let channel_id = msg.source_channel_id.as_str();
    debug!(%platform, channel = channel_id, ?command, "Executing admin command");

    if command.requires_admin() && !admins.allows(platform, &msg.source_user_id) {
        warn!(
            %platform,
            channel = channel_id,
            user = %msg.source_user_id,
            "Rejected admin command from non-admin"
        );
        return PERMISSION_DENIED.to_string();
    }

    match command {
        AdminCommand::BridgeStatus => bridge_status(core, platform, channel_id).await,
        AdminCommand::BridgeCreate {
            platform: target_platform,
            channel_id: target_channel,
        } => match core
            .add_bridge(platform, channel_id, target_platform, &target_channel)
            .await
        {
            Ok(_) => {
                info!(
                    "Bridge created by command: {} {} <-> {} {}",
                    platform, channel_id, target_platform, target_channel
                );
                format!(
                    "Bridge created: {} `{}` <-> {} `{}`",
                    platform, channel_id, target_platform, target_channel
                )
            }
            Err(e) => format!("Failed to create bridge: {}", e),
        },
        AdminCommand::BridgeRemove {
            platform: target_platform,
        } => match core.remove_bridge(channel_id, target_platform).await {
            Ok(_) => format!("Removed {} bridge for this channel", target_platform),
            Err(e) => format!("Failed to remove bridge: {}", e),
        },
        AdminCommand::Platforms => platforms(core).await,
        AdminCommand::Help => HELP_TEXT.to_string(),
        AdminCommand::Invalid { reply } => reply,
    }
}

async fn bridge_status(core: &BridgeCore, platform: Platform, channel_id: &str) -> String {
    let mut out = format!("**Bridge status for {} channel `{}`**\n", platform, channel_id);

    let routes: Vec<_> = core
        .routes_for(channel_id)
        .await
        .into_iter()
        .filter(|r| r.source.platform == platform)
        .collect();
    if routes.is_empty() {
        out.push_str("No bridges configured for this channel\n");
    } else {
        for route in routes {
            let _ = writeln!(out, "• **{}**: `{}`", route.target.platform, route.target.channel_id);
        }
    }

    out.push_str("**Platforms**\n");
    for (platform, connected) in core.get_platform_status().await {
        let state = if connected { "connected" } else { "disconnected" };
        let _ = writeln!(out, "• {}: {}", platform, state);
    }
    out.trim_end().to_string()
}

async fn platforms(core: &BridgeCore) -> String {
    let status = core.get_platform_status().await;
    if status.is_empty() {
        return "No platforms registered".to_string();
    }

    let mut out = String::from("**Registered platforms**\n");
    for (platform, connected) in status {
        let state = if connected { "connected" } else { "disconnected" };
        let _ = writeln!(out, "• {}: {}", platform, state);
    }

    let stats = core.bridge_stats().await;
    let _ = write!(
        out,
        "Bridges: {} ({} directed routes across {} channels)",
        stats.logical_bridges, stats.directed_edges, stats.bridged_channels
    );
    out
}
