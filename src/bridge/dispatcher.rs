//! Inbound event pump.
//!
//! Adapters push normalized messages into an unbounded channel. Each
//! message is handled on its own task so a slow platform never holds up
//! unrelated traffic. On shutdown intake stops and in-flight tasks get a
//! bounded grace period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::common::BridgeMessage;

use super::commands::{self, parse_command, AdminList};
use super::core::BridgeCore;

/// Sender handed to platform adapters.
pub type InboundSender = mpsc::UnboundedSender<BridgeMessage>;

/// Counters reported when the dispatcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub accepted: usize,
    pub commands: usize,
    /// All in-flight tasks finished within the grace period.
    pub drained: bool,
}

pub struct Dispatcher {
    core: Arc<BridgeCore>,
    admins: Arc<AdminList>,
    inbound_rx: mpsc::UnboundedReceiver<BridgeMessage>,
    shutdown_rx: watch::Receiver<bool>,
    tracker: TaskTracker,
    shutdown_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher and the sender adapters feed it through.
    pub fn new(
        core: Arc<BridgeCore>,
        admins: AdminList,
        shutdown_rx: watch::Receiver<bool>,
        shutdown_timeout: Duration,
    ) -> (Self, InboundSender) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            core,
            admins: Arc::new(admins),
            inbound_rx,
            shutdown_rx,
            tracker: TaskTracker::new(),
            shutdown_timeout,
        };
        (dispatcher, inbound_tx)
    }

    /// Pump messages until shutdown is signalled or every sender is gone.
    pub async fn run(mut self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        loop {
            tokio::select! {
                biased;
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Dispatcher received shutdown signal");
                        break;
                    }
                }
                msg = self.inbound_rx.recv() => match msg {
                    Some(msg) => {
                        summary.accepted += 1;
                        if self.spawn_handler(msg) {
                            summary.commands += 1;
                        }
                    }
                    None => {
                        debug!("All inbound senders dropped");
                        break;
                    }
                }
            }
        }

        self.inbound_rx.close();
        self.tracker.close();
        summary.drained =
            match tokio::time::timeout(self.shutdown_timeout, self.tracker.wait()).await {
                Ok(()) => true,
                Err(_) => {
                    warn!(
                        pending = self.tracker.len(),
                        "Timed out waiting for in-flight messages"
                    );
                    false
                }
            };

        info!(
            accepted = summary.accepted,
            commands = summary.commands,
            "Dispatcher stopped"
        );
        summary
    }

    /// Spawn the task for one message. Returns `true` for admin commands.
    fn spawn_handler(&self, msg: BridgeMessage) -> bool {
        let core = Arc::clone(&self.core);

        if let Some(command) = parse_command(&msg.content) {
            let admins = Arc::clone(&self.admins);
            self.tracker.spawn(async move {
                let reply = commands::execute(&core, &admins, command, &msg).await;
                if let Err(e) = core
                    .reply(msg.source_platform, &msg.source_channel_id, &reply)
                    .await
                {
                    warn!("Failed to send command reply: {}", e);
                }
            });
            return true;
        }

        self.tracker.spawn(async move {
            match core.process_message(&msg).await {
                Ok(report) if !report.failures.is_empty() => {
                    warn!(
                        message_id = %msg.id,
                        failed = report.failures.len(),
                        delivered = report.delivered,
                        "Message partially delivered"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(message_id = %msg.id, "Failed to process message: {}", e),
            }
        });
        false
    }
}
