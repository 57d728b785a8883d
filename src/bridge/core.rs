//! Bridge core: adapter registry, bridge lifecycle and message fan-out.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::common::error::{BridgeError, BridgeResult, DeliveryError, StoreError, StoreResult};
use crate::common::types::Platform;
use crate::common::BridgeMessage;
use crate::config::types::{BridgeSettings, FiltersConfig};
use crate::platform::formatter::{rich_display_name, split_message};
use crate::platform::PlatformAdapter;
use crate::store::{ChannelRef, PersistedBridge, RoomStore};

use super::filter::MessageFilter;
use super::graph::{BridgeConnection, ConnectionGraph};

/// Runtime knobs for fan-out.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub delivery_timeout: Duration,
    pub max_message_length: usize,
    pub filter: MessageFilter,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&BridgeSettings::default(), &FiltersConfig::default())
    }
}

impl BridgeOptions {
    pub fn from_config(settings: &BridgeSettings, filters: &FiltersConfig) -> Self {
        Self {
            delivery_timeout: settings.delivery_timeout(),
            max_message_length: settings.max_message_length.max(1),
            filter: MessageFilter::from_config(filters),
        }
    }
}

/// Outcome of fanning one message out.
#[derive(Debug, Default)]
pub struct FanoutReport {
    /// Routes considered for the message.
    pub routes: usize,
    pub delivered: usize,
    /// Routes skipped because the target adapter is missing or offline.
    pub skipped: usize,
    /// Deliveries that needed the generic path after rich delivery failed.
    pub fallbacks: usize,
    /// Per-route delivery failures.
    pub failures: Vec<BridgeError>,
    /// Message was blocked by the content filter.
    pub filtered: bool,
}

/// Snapshot of bridge counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Bridged channel pairs (each held as two directed edges).
    pub logical_bridges: usize,
    pub active_bridges: usize,
    pub directed_edges: usize,
    pub registered_platforms: usize,
    pub bridged_channels: usize,
}

enum RouteOutcome {
    Delivered { fallback: bool },
    Skipped,
    Failed(BridgeError),
}

/// Owns the connection graph and drives delivery through platform adapters.
pub struct BridgeCore {
    store: Arc<dyn RoomStore>,
    adapters: RwLock<HashMap<Platform, Arc<dyn PlatformAdapter>>>,
    graph: RwLock<ConnectionGraph>,
    /// Display names per platform, keyed by platform user id.
    user_names: RwLock<HashMap<Platform, HashMap<String, String>>>,
    options: BridgeOptions,
}

impl BridgeCore {
    /// Create a core with an empty graph.
    pub fn new(store: Arc<dyn RoomStore>, options: BridgeOptions) -> Self {
        Self {
            store,
            adapters: RwLock::new(HashMap::new()),
            graph: RwLock::new(ConnectionGraph::new()),
            user_names: RwLock::new(HashMap::new()),
            options,
        }
    }

    /// Create a core and rebuild its graph from the store.
    ///
    /// A store that cannot be read leaves the graph empty; new bridges can
    /// still be created.
    pub async fn start(store: Arc<dyn RoomStore>, options: BridgeOptions) -> Self {
        let core = Self::new(store, options);
        match core.reload().await {
            Ok(edges) => info!(edges, "Loaded bridges from database"),
            Err(e) => warn!(
                "Failed to load bridges from database, starting with no bridges: {}",
                e
            ),
        }
        core
    }

    /// Rebuild the graph from the store, replacing the current edges.
    pub async fn reload(&self) -> BridgeResult<usize> {
        let rooms = self
            .with_store(|store| store.get_all_active_bridged_mappings())
            .await?;
        let rebuilt = ConnectionGraph::from_room_mappings(&rooms);
        let edges = rebuilt.len();
        *self.graph.write().await = rebuilt;
        debug!(rooms = rooms.len(), edges, "Connection graph reloaded");
        Ok(edges)
    }

    /// Register an adapter under its platform. Re-registration replaces it.
    pub async fn register_platform(&self, adapter: Arc<dyn PlatformAdapter>) {
        let platform = adapter.platform();
        let replaced = self
            .adapters
            .write()
            .await
            .insert(platform, adapter)
            .is_some();
        self.user_names.write().await.entry(platform).or_default();

        if replaced {
            info!(%platform, "Replaced platform adapter");
        } else {
            info!(%platform, "Registered platform adapter");
        }
    }

    pub async fn is_registered(&self, platform: Platform) -> bool {
        self.adapters.read().await.contains_key(&platform)
    }

    /// Registered platforms, ordered.
    pub async fn registered_platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.adapters.read().await.keys().copied().collect();
        platforms.sort();
        platforms
    }

    /// Bridge two channels in both directions.
    ///
    /// Persists first; the graph only changes once the write committed.
    /// Returns the forward connection.
    pub async fn add_bridge(
        &self,
        source_platform: Platform,
        source_channel: &str,
        target_platform: Platform,
        target_channel: &str,
    ) -> BridgeResult<BridgeConnection> {
        for platform in [source_platform, target_platform] {
            if !self.is_registered(platform).await {
                return Err(BridgeError::unknown(platform));
            }
        }

        let source = ChannelRef::new(source_platform, source_channel.trim());
        let target = ChannelRef::new(target_platform, target_channel.trim());
        if source.channel_id.is_empty() || target.channel_id.is_empty() {
            return Err(BridgeError::InvalidArgument {
                message: "channel id must not be empty".to_string(),
            });
        }
        if source == target {
            return Err(BridgeError::InvalidArgument {
                message: format!("cannot bridge {} to itself", source.label()),
            });
        }

        let persisted = {
            let (source, target) = (source.clone(), target.clone());
            self.with_store(move |store| store.persist_bridge(&source, &target))
                .await?
        };

        let added = self.apply_persisted(&source, &target, &persisted).await;
        info!(
            room_id = persisted.room.id,
            edges_added = added,
            "Bridge created: {} <-> {}",
            source.label(),
            target.label()
        );

        Ok(BridgeConnection::new(persisted.room.id, source, target))
    }

    async fn apply_persisted(
        &self,
        source: &ChannelRef,
        target: &ChannelRef,
        persisted: &PersistedBridge,
    ) -> usize {
        let room_id = persisted.room.id;
        let members: Vec<ChannelRef> = persisted
            .members
            .iter()
            .map(|m| ChannelRef::new(m.platform, m.platform_channel_id.clone()))
            .collect();

        let mut graph = self.graph.write().await;
        graph.detach_from_other_rooms(source, room_id);
        graph.detach_from_other_rooms(target, room_id);

        let mut added = graph.link(room_id, source, target);
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                added += graph.link(room_id, a, b);
            }
        }
        added
    }

    /// Remove the bridge from `source_channel` to `target_platform`.
    ///
    /// Deactivates the target platform's mapping in the source channel's
    /// room and drops every edge touching the deactivated channels.
    pub async fn remove_bridge(
        &self,
        source_channel: &str,
        target_platform: Platform,
    ) -> BridgeResult<usize> {
        if !self.is_registered(target_platform).await {
            return Err(BridgeError::unknown(target_platform));
        }

        let edge = self
            .graph
            .read()
            .await
            .find_route(source_channel, target_platform)
            .cloned()
            .ok_or_else(|| BridgeError::BridgeNotFound {
                channel_id: source_channel.to_string(),
                platform: target_platform,
            })?;

        let (room_id, deactivated) = {
            let edge = edge.clone();
            self.with_store(move |store| {
                let room_id = store
                    .get_room_mapping_by_platform_channel(edge.source.platform, &edge.source.channel_id)?
                    .map(|m| m.room_id)
                    .unwrap_or(edge.room_id);
                let deactivated: Vec<ChannelRef> = store
                    .get_active_room_mappings(room_id)?
                    .into_iter()
                    .filter(|m| m.platform == target_platform)
                    .map(|m| ChannelRef::new(m.platform, m.platform_channel_id))
                    .collect();
                store.deactivate_room_mapping(room_id, target_platform)?;
                Ok((room_id, deactivated))
            })
            .await?
        };

        let removed = {
            let mut graph = self.graph.write().await;
            let mut removed = graph.remove_pair(&edge);
            for channel in &deactivated {
                removed += graph.drop_channel(channel);
            }
            removed
        };

        info!(
            room_id,
            edges_removed = removed,
            "Bridge removed: {} -> {}",
            edge.source.label(),
            target_platform
        );
        Ok(removed)
    }

    /// Outgoing routes for a channel id.
    pub async fn routes_for(&self, channel_id: &str) -> Vec<BridgeConnection> {
        self.graph.read().await.routes_for(channel_id).to_vec()
    }

    /// Every edge in the graph.
    pub async fn connections(&self) -> Vec<BridgeConnection> {
        self.graph.read().await.connections()
    }

    /// Record a display name for a platform user.
    pub async fn set_user_mapping(
        &self,
        platform: Platform,
        user_id: &str,
        display_name: &str,
    ) -> BridgeResult<()> {
        if user_id.is_empty() {
            return Err(BridgeError::InvalidArgument {
                message: "user id must not be empty".to_string(),
            });
        }
        self.user_names
            .write()
            .await
            .entry(platform)
            .or_default()
            .insert(user_id.to_string(), display_name.to_string());
        Ok(())
    }

    /// Best available label for a sender: the supplied username, then the
    /// cached name, then the raw user id.
    pub async fn display_name(&self, platform: Platform, user_id: &str, username: &str) -> String {
        if !username.is_empty() {
            return username.to_string();
        }
        self.user_names
            .read()
            .await
            .get(&platform)
            .and_then(|names| names.get(user_id))
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| user_id.to_string())
    }

    /// Connectivity of every registered adapter, read now.
    pub async fn get_platform_status(&self) -> BTreeMap<Platform, bool> {
        self.adapters
            .read()
            .await
            .iter()
            .map(|(platform, adapter)| (*platform, adapter.is_connected()))
            .collect()
    }

    pub async fn bridge_stats(&self) -> BridgeStats {
        let graph = self.graph.read().await.stats();
        BridgeStats {
            logical_bridges: graph.directed_edges / 2,
            active_bridges: graph.active_edges / 2,
            directed_edges: graph.directed_edges,
            registered_platforms: self.adapters.read().await.len(),
            bridged_channels: graph.channels,
        }
    }

    /// Deliver a message to every active route of its source channel.
    ///
    /// Per-route failures are collected in the report and never stop
    /// delivery to the remaining routes.
    pub async fn process_message(&self, msg: &BridgeMessage) -> BridgeResult<FanoutReport> {
        let mut report = FanoutReport::default();

        if self.options.filter.should_filter(&msg.full_content()) {
            info!(
                platform = %msg.source_platform,
                channel = %msg.source_channel_id,
                "FILTERED message from {}",
                msg.source_user_id
            );
            report.filtered = true;
            return Ok(report);
        }

        if !msg.username.is_empty() && !msg.source_user_id.is_empty() {
            self.set_user_mapping(msg.source_platform, &msg.source_user_id, &msg.username)
                .await?;
        }

        let routes: Vec<BridgeConnection> = self
            .graph
            .read()
            .await
            .routes_for(&msg.source_channel_id)
            .iter()
            .filter(|e| e.is_active && e.source.platform == msg.source_platform)
            .cloned()
            .collect();

        if routes.is_empty() {
            debug!(
                platform = %msg.source_platform,
                channel = %msg.source_channel_id,
                "No routes for message"
            );
            return Ok(report);
        }

        let mut resolved = msg.clone();
        resolved.username = self
            .display_name(msg.source_platform, &msg.source_user_id, &msg.username)
            .await;

        let targets: Vec<(BridgeConnection, Option<Arc<dyn PlatformAdapter>>)> = {
            let adapters = self.adapters.read().await;
            routes
                .into_iter()
                .map(|route| {
                    let adapter = adapters.get(&route.target.platform).cloned();
                    (route, adapter)
                })
                .collect()
        };

        report.routes = targets.len();
        let outcomes = join_all(
            targets
                .iter()
                .map(|(route, adapter)| self.deliver(route, adapter.as_deref(), &resolved)),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                RouteOutcome::Delivered { fallback } => {
                    report.delivered += 1;
                    report.fallbacks += usize::from(fallback);
                }
                RouteOutcome::Skipped => report.skipped += 1,
                RouteOutcome::Failed(e) => report.failures.push(e),
            }
        }

        debug!(
            message_id = %msg.id,
            routes = report.routes,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Fan-out complete"
        );
        Ok(report)
    }

    /// Send text straight to one channel, bypassing the graph.
    pub async fn reply(&self, platform: Platform, channel_id: &str, text: &str) -> BridgeResult<()> {
        let adapter = self
            .adapters
            .read()
            .await
            .get(&platform)
            .cloned()
            .ok_or_else(|| BridgeError::unknown(platform))?;

        self.bounded(adapter.send_message(channel_id, text))
            .await
            .map_err(|source| BridgeError::Delivery {
                platform,
                channel_id: channel_id.to_string(),
                source,
            })
    }

    async fn deliver(
        &self,
        route: &BridgeConnection,
        adapter: Option<&dyn PlatformAdapter>,
        msg: &BridgeMessage,
    ) -> RouteOutcome {
        let target = &route.target;
        let Some(adapter) = adapter else {
            debug!(platform = %target.platform, "No adapter registered, skipping route");
            return RouteOutcome::Skipped;
        };
        if !adapter.is_connected() {
            debug!(
                platform = %target.platform,
                channel = %target.channel_id,
                "Target not connected, skipping route"
            );
            return RouteOutcome::Skipped;
        }

        let chunks = split_message(&msg.full_content(), self.options.max_message_length);
        let mut use_rich = adapter.rich_delivery().is_some();
        let mut fallback = false;

        for chunk in &chunks {
            if use_rich {
                if let Some(rich) = adapter.rich_delivery() {
                    let label = rich_display_name(msg.source_platform, &msg.username);
                    let sent = self
                        .bounded(rich.send_rich(
                            &target.channel_id,
                            chunk,
                            &label,
                            msg.avatar_url.as_deref(),
                        ))
                        .await;
                    match sent {
                        Ok(()) => continue,
                        Err(e) => {
                            warn!(
                                platform = %target.platform,
                                channel = %target.channel_id,
                                "Rich delivery failed, falling back to plain send: {}",
                                e
                            );
                            use_rich = false;
                            fallback = true;
                        }
                    }
                }
            }

            let mut part = msg.clone();
            part.content = chunk.clone();
            part.attachments.clear();
            let text = adapter.format_message(&part);

            if let Err(e) = self
                .bounded(adapter.send_message(&target.channel_id, &text))
                .await
            {
                warn!(
                    platform = %target.platform,
                    channel = %target.channel_id,
                    "Delivery failed: {}",
                    e
                );
                return RouteOutcome::Failed(BridgeError::Delivery {
                    platform: target.platform,
                    channel_id: target.channel_id.clone(),
                    source: e,
                });
            }
        }

        RouteOutcome::Delivered { fallback }
    }

    async fn bounded<F>(&self, send: F) -> Result<(), DeliveryError>
    where
        F: Future<Output = Result<(), DeliveryError>>,
    {
        let limit = self.options.delivery_timeout;
        tokio::time::timeout(limit, send)
            .await
            .unwrap_or(Err(DeliveryError::Timeout {
                seconds: limit.as_secs(),
            }))
    }

    async fn with_store<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn RoomStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::Task {
                message: e.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::common::types::ChannelKind;
    use crate::platform::testing::MockAdapter;
    use crate::store::{BridgeConfig, Room, RoomMapping, SqliteStore};

    /// Store that delegates to SQLite until told to fail.
    struct FlakyStore {
        inner: SqliteStore,
        fail: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: SqliteStore::open_in_memory().unwrap(),
                fail: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            let store = Self::new();
            store.set_failing(true);
            store
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> StoreResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(StoreError::Task {
                    message: "disk unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl RoomStore for FlakyStore {
        fn create_or_get_room(&self, name: &str) -> StoreResult<Room> {
            self.check()?;
            self.inner.create_or_get_room(name)
        }

        fn create_or_get_room_mapping(
            &self,
            room_id: i64,
            platform: Platform,
            channel_id: &str,
            label: &str,
            kind: ChannelKind,
        ) -> StoreResult<RoomMapping> {
            self.check()?;
            self.inner
                .create_or_get_room_mapping(room_id, platform, channel_id, label, kind)
        }

        fn get_room_mapping_by_platform_channel(
            &self,
            platform: Platform,
            channel_id: &str,
        ) -> StoreResult<Option<RoomMapping>> {
            self.check()?;
            self.inner
                .get_room_mapping_by_platform_channel(platform, channel_id)
        }

        fn get_active_room_mappings(&self, room_id: i64) -> StoreResult<Vec<RoomMapping>> {
            self.check()?;
            self.inner.get_active_room_mappings(room_id)
        }

        fn deactivate_room_mapping(&self, room_id: i64, platform: Platform) -> StoreResult<usize> {
            self.check()?;
            self.inner.deactivate_room_mapping(room_id, platform)
        }

        fn create_or_get_bridge_config(&self, room_id: i64) -> StoreResult<BridgeConfig> {
            self.check()?;
            self.inner.create_or_get_bridge_config(room_id)
        }

        fn update_bridge_config(&self, config: &BridgeConfig) -> StoreResult<()> {
            self.check()?;
            self.inner.update_bridge_config(config)
        }

        fn get_all_active_bridged_mappings(
            &self,
        ) -> StoreResult<BTreeMap<i64, Vec<RoomMapping>>> {
            self.check()?;
            self.inner.get_all_active_bridged_mappings()
        }

        fn persist_bridge(
            &self,
            source: &ChannelRef,
            target: &ChannelRef,
        ) -> StoreResult<PersistedBridge> {
            self.check()?;
            self.inner.persist_bridge(source, target)
        }
    }

    struct Harness {
        core: BridgeCore,
        store: Arc<FlakyStore>,
        discord: Arc<MockAdapter>,
        telegram: Arc<MockAdapter>,
    }

    async fn harness_with(discord: MockAdapter, options: BridgeOptions) -> Harness {
        let store = Arc::new(FlakyStore::new());
        let core = BridgeCore::new(store.clone(), options);
        let discord = Arc::new(discord);
        let telegram = Arc::new(MockAdapter::new(Platform::Telegram));
        core.register_platform(discord.clone()).await;
        core.register_platform(telegram.clone()).await;
        Harness {
            core,
            store,
            discord,
            telegram,
        }
    }

    async fn harness() -> Harness {
        harness_with(MockAdapter::new(Platform::Discord), BridgeOptions::default()).await
    }

    fn from_discord(channel: &str, content: &str) -> BridgeMessage {
        BridgeMessage::text(Platform::Discord, channel, "d-user-1", content).with_username("alice")
    }

    fn from_telegram(channel: &str, content: &str) -> BridgeMessage {
        BridgeMessage::text(Platform::Telegram, channel, "t-user-1", content).with_username("@bob")
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trip() {
        let h = harness().await;
        assert_ok!(
            h.core
                .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
                .await
        );

        let report = h.core.process_message(&from_discord("100", "hello")).await.unwrap();
        assert_eq!(report.delivered, 1);
        let sent = h.telegram.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel_id, "200");
        assert_eq!(sent[0].text, "[DISCORD] @alice: hello");

        assert_ok!(h.core.remove_bridge("100", Platform::Telegram).await);

        let report = h.core.process_message(&from_discord("100", "again")).await.unwrap();
        assert_eq!(report.routes, 0);
        assert_eq!(h.telegram.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_add_bridge_is_bidirectional() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();

        let forward = h.core.routes_for("1").await;
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].target, ChannelRef::new(Platform::Telegram, "2"));

        let reverse = h.core.routes_for("2").await;
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].target, ChannelRef::new(Platform::Discord, "1"));
    }

    #[tokio::test]
    async fn test_remove_is_symmetric() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();
        h.core.remove_bridge("1", Platform::Telegram).await.unwrap();

        assert!(h
            .core
            .routes_for("1")
            .await
            .iter()
            .all(|e| e.target.platform != Platform::Telegram));
        assert!(h
            .core
            .routes_for("2")
            .await
            .iter()
            .all(|e| e.target.platform != Platform::Discord));
        assert!(h
            .store
            .get_room_mapping_by_platform_channel(Platform::Telegram, "2")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_platform_rejected_before_store() {
        let store = Arc::new(FlakyStore::new());
        let core = BridgeCore::new(store.clone(), BridgeOptions::default());
        core.register_platform(Arc::new(MockAdapter::new(Platform::Discord)))
            .await;

        let err = core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownPlatform { ref platform } if platform == "telegram"));
        assert!(store.get_all_active_bridged_mappings().unwrap().is_empty());

        assert_err!(core.remove_bridge("1", Platform::Telegram).await);
    }

    #[tokio::test]
    async fn test_invalid_channels_rejected() {
        let h = harness().await;
        let err = h
            .core
            .add_bridge(Platform::Discord, "", Platform::Telegram, "2")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));

        let err = h
            .core
            .add_bridge(Platform::Discord, "1", Platform::Discord, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_store_failure_leaves_graph_unchanged() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();
        let before = h.core.connections().await.len();

        h.store.set_failing(true);
        let err = h
            .core
            .add_bridge(Platform::Discord, "3", Platform::Telegram, "4")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Persistence(_)));

        let err = h.core.remove_bridge("1", Platform::Telegram).await.unwrap_err();
        assert!(matches!(err, BridgeError::Persistence(_)));

        assert_eq!(h.core.connections().await.len(), before);
        assert!(h.core.routes_for("3").await.is_empty());
        assert_eq!(h.core.routes_for("1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_bridge_is_not_found() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();

        let err = h.core.remove_bridge("9", Platform::Telegram).await.unwrap_err();
        assert!(matches!(err, BridgeError::BridgeNotFound { .. }));

        let err = h.core.remove_bridge("1", Platform::Discord).await.unwrap_err();
        assert!(matches!(err, BridgeError::BridgeNotFound { .. }));

        // Store untouched
        assert!(h
            .store
            .get_room_mapping_by_platform_channel(Platform::Telegram, "2")
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_no_routes_is_noop() {
        let h = harness().await;
        let report = assert_ok!(h.core.process_message(&from_discord("404", "hi")).await);
        assert_eq!(report.routes, 0);
        assert!(report.failures.is_empty());
        assert_eq!(h.telegram.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disconnected_target_does_not_block_others() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Discord, "101")
            .await
            .unwrap();
        assert_eq!(h.core.connections().await.len(), 6);

        h.telegram.set_connected(false);
        let report = h.core.process_message(&from_discord("100", "hi")).await.unwrap();

        assert_eq!(report.routes, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(h.telegram.attempts.load(Ordering::SeqCst), 0);
        let sent = h.discord.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel_id, "101");
    }

    #[tokio::test]
    async fn test_failed_send_does_not_abort_fanout() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Discord, "101")
            .await
            .unwrap();

        h.telegram.set_fail_sends(true);
        let report = h.core.process_message(&from_discord("100", "hi")).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            BridgeError::Delivery { platform: Platform::Telegram, .. }
        ));
        assert_eq!(h.discord.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_rich_delivery_used_when_available() {
        let h = harness_with(
            MockAdapter::with_rich(Platform::Discord, false),
            BridgeOptions::default(),
        )
        .await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();

        let report = h.core.process_message(&from_telegram("200", "hey")).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.fallbacks, 0);

        let sent = h.discord.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "hey");
        assert_eq!(sent[0].display_name.as_deref(), Some("[TELEGRAM] bob"));
    }

    #[tokio::test]
    async fn test_rich_failure_falls_back_to_plain_send() {
        let h = harness_with(
            MockAdapter::with_rich(Platform::Discord, true),
            BridgeOptions::default(),
        )
        .await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();

        let report = h.core.process_message(&from_telegram("200", "hey")).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.fallbacks, 1);

        let sent = h.discord.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].display_name, None);
        assert_eq!(sent[0].text, "[TELEGRAM] **@bob**: hey");
    }

    #[tokio::test]
    async fn test_display_name_fallbacks() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();

        // Unknown sender falls back to the user id
        let msg = BridgeMessage::text(Platform::Discord, "100", "u42", "one");
        h.core.process_message(&msg).await.unwrap();

        h.core
            .set_user_mapping(Platform::Discord, "u42", "carol")
            .await
            .unwrap();
        let msg = BridgeMessage::text(Platform::Discord, "100", "u42", "two");
        h.core.process_message(&msg).await.unwrap();

        let texts: Vec<String> = h.telegram.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["[DISCORD] @u42: one", "[DISCORD] @carol: two"]);

        assert_err!(h.core.set_user_mapping(Platform::Discord, "", "x").await);
    }

    #[tokio::test]
    async fn test_inbound_username_refreshes_cache() {
        let h = harness().await;
        h.core.process_message(&from_discord("100", "hi")).await.unwrap();
        assert_eq!(
            h.core.display_name(Platform::Discord, "d-user-1", "").await,
            "alice"
        );
    }

    #[tokio::test]
    async fn test_filtered_message_not_delivered() {
        let options = BridgeOptions {
            filter: MessageFilter::new(vec!["(?i)spam".to_string()]),
            ..BridgeOptions::default()
        };
        let h = harness_with(MockAdapter::new(Platform::Discord), options).await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();

        let report = h.core.process_message(&from_discord("100", "SPAM here")).await.unwrap();
        assert!(report.filtered);
        assert_eq!(h.telegram.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_content_split_into_chunks() {
        let options = BridgeOptions {
            max_message_length: 11,
            ..BridgeOptions::default()
        };
        let h = harness_with(MockAdapter::new(Platform::Discord), options).await;
        h.core
            .add_bridge(Platform::Discord, "100", Platform::Telegram, "200")
            .await
            .unwrap();

        h.core
            .process_message(&from_discord("100", "hello world again"))
            .await
            .unwrap();
        let texts: Vec<String> = h.telegram.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(
            texts,
            vec!["[DISCORD] @alice: hello", "[DISCORD] @alice: world again"]
        );
    }

    #[tokio::test]
    async fn test_runtime_graph_matches_rebuild() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();
        h.core
            .add_bridge(Platform::Telegram, "2", Platform::Discord, "3")
            .await
            .unwrap();
        h.core
            .add_bridge(Platform::Discord, "5", Platform::Telegram, "6")
            .await
            .unwrap();
        h.core.remove_bridge("5", Platform::Telegram).await.unwrap();

        let live: Vec<String> = {
            let mut ids: Vec<String> = h.core.connections().await.into_iter().map(|e| e.id).collect();
            ids.sort();
            ids
        };
        // Room {1,2,3} gives 6 edges, the emptied room none
        assert_eq!(live.len(), 6);

        let restarted = BridgeCore::start(h.store.clone(), BridgeOptions::default()).await;
        let mut rebuilt: Vec<String> = restarted.connections().await.into_iter().map(|e| e.id).collect();
        rebuilt.sort();
        assert_eq!(live, rebuilt);

        // Reloading twice yields the same edges
        restarted.reload().await.unwrap();
        let mut again: Vec<String> = restarted.connections().await.into_iter().map(|e| e.id).collect();
        again.sort();
        assert_eq!(rebuilt, again);
    }

    #[tokio::test]
    async fn test_start_with_unreadable_store_is_empty() {
        let store = Arc::new(FlakyStore::failing());
        let core = BridgeCore::start(store.clone(), BridgeOptions::default()).await;
        assert!(core.connections().await.is_empty());

        // Bridges can still be created once the store recovers
        core.register_platform(Arc::new(MockAdapter::new(Platform::Discord)))
            .await;
        core.register_platform(Arc::new(MockAdapter::new(Platform::Telegram)))
            .await;
        store.set_failing(false);
        assert_ok!(
            core.add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
                .await
        );
    }

    #[tokio::test]
    async fn test_platform_status_and_stats() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();
        h.telegram.set_connected(false);

        let status = h.core.get_platform_status().await;
        assert_eq!(status.get(&Platform::Discord), Some(&true));
        assert_eq!(status.get(&Platform::Telegram), Some(&false));

        let stats = h.core.bridge_stats().await;
        assert_eq!(stats.logical_bridges, 1);
        assert_eq!(stats.directed_edges, 2);
        assert_eq!(stats.registered_platforms, 2);
        assert_eq!(stats.bridged_channels, 2);
    }

    #[tokio::test]
    async fn test_reregistration_replaces_adapter() {
        let h = harness().await;
        h.core
            .add_bridge(Platform::Discord, "1", Platform::Telegram, "2")
            .await
            .unwrap();

        let replacement = Arc::new(MockAdapter::new(Platform::Telegram));
        h.core.register_platform(replacement.clone()).await;
        h.core.process_message(&from_discord("1", "hi")).await.unwrap();

        assert_eq!(h.telegram.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(replacement.sent().len(), 1);
        assert_eq!(h.core.registered_platforms().await.len(), 2);
    }
}
