//! In-memory connection graph.
//!
//! Directed edges keyed by source channel id. Every bridged pair is held as
//! a forward and a reverse edge so routing is a single map lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::common::types::Platform;
use crate::store::{ChannelRef, RoomMapping};

/// A directed route from one platform channel to another.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConnection {
    pub id: String,
    pub room_id: i64,
    pub source: ChannelRef,
    pub target: ChannelRef,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl BridgeConnection {
    pub fn new(room_id: i64, source: ChannelRef, target: ChannelRef) -> Self {
        Self {
            id: connection_id(room_id, &source, &target),
            room_id,
            source,
            target,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Same edge with source and target swapped.
    pub fn reversed(&self) -> Self {
        Self::new(self.room_id, self.target.clone(), self.source.clone())
    }

    fn touches(&self, channel: &ChannelRef) -> bool {
        &self.source == channel || &self.target == channel
    }
}

/// Deterministic edge identifier.
pub fn connection_id(room_id: i64, source: &ChannelRef, target: &ChannelRef) -> String {
    format!(
        "room{}:{}:{}->{}:{}",
        room_id, source.platform, source.channel_id, target.platform, target.channel_id
    )
}

/// Edge counts at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub directed_edges: usize,
    pub active_edges: usize,
    /// Distinct channels with at least one outgoing edge.
    pub channels: usize,
}

/// Routing table of bridge connections.
#[derive(Debug, Default)]
pub struct ConnectionGraph {
    by_source: HashMap<String, Vec<BridgeConnection>>,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from active mappings grouped by room.
    ///
    /// Rooms with N >= 2 mappings yield N*(N-1) edges, one per ordered pair.
    pub fn from_room_mappings(rooms: &BTreeMap<i64, Vec<RoomMapping>>) -> Self {
        let mut graph = Self::new();
        for (&room_id, mappings) in rooms {
            if mappings.len() < 2 {
                debug!(room_id, "Skipping room with fewer than two mappings");
                continue;
            }
            for (i, from) in mappings.iter().enumerate() {
                for (j, to) in mappings.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    graph.insert(BridgeConnection::new(
                        room_id,
                        mapping_ref(from),
                        mapping_ref(to),
                    ));
                }
            }
        }
        debug!(edges = graph.len(), "Connection graph built");
        graph
    }

    /// Insert an edge. Returns `false` if an edge with the same source
    /// channel, target platform and target channel already exists, or if
    /// the edge would loop back onto its source.
    pub fn insert(&mut self, connection: BridgeConnection) -> bool {
        if connection.source == connection.target {
            return false;
        }
        let edges = self
            .by_source
            .entry(connection.source.channel_id.clone())
            .or_default();
        let exists = edges.iter().any(|e| {
            e.source.platform == connection.source.platform && e.target == connection.target
        });
        if exists {
            return false;
        }
        edges.push(connection);
        true
    }

    /// Insert the forward and reverse edge between two channels.
    /// Returns the number of edges actually added.
    pub fn link(&mut self, room_id: i64, a: &ChannelRef, b: &ChannelRef) -> usize {
        let forward = BridgeConnection::new(room_id, a.clone(), b.clone());
        let reverse = forward.reversed();
        usize::from(self.insert(forward)) + usize::from(self.insert(reverse))
    }

    /// Outgoing edges for a source channel id.
    pub fn routes_for(&self, channel_id: &str) -> &[BridgeConnection] {
        self.by_source
            .get(channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Edge from `channel_id` to a channel on `target_platform`.
    ///
    /// Channel ids are not unique across platforms. When both a channel on
    /// `target_platform` and one elsewhere share `channel_id`, the edge
    /// leaving the other platform wins.
    pub fn find_route(
        &self,
        channel_id: &str,
        target_platform: Platform,
    ) -> Option<&BridgeConnection> {
        self.routes_for(channel_id)
            .iter()
            .filter(|e| e.target.platform == target_platform)
            .min_by_key(|e| e.source.platform == target_platform)
    }

    /// Remove an edge and its reverse. Returns the number removed.
    pub fn remove_pair(&mut self, connection: &BridgeConnection) -> usize {
        let mut removed = 0;
        removed += self.remove_where(&connection.source.channel_id, |e| {
            e.source == connection.source && e.target == connection.target
        });
        removed += self.remove_where(&connection.target.channel_id, |e| {
            e.source == connection.target && e.target == connection.source
        });
        removed
    }

    /// Remove every edge into or out of `channel`. Returns the number removed.
    pub fn drop_channel(&mut self, channel: &ChannelRef) -> usize {
        self.retain(|e| !e.touches(channel))
    }

    /// Remove edges touching `channel` that belong to a room other than
    /// `room_id`. Used when a channel moves between rooms.
    pub fn detach_from_other_rooms(&mut self, channel: &ChannelRef, room_id: i64) -> usize {
        self.retain(|e| e.room_id == room_id || !e.touches(channel))
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of every edge, ordered.
    pub fn edge_ids(&self) -> BTreeSet<String> {
        self.by_source
            .values()
            .flatten()
            .map(|e| e.id.clone())
            .collect()
    }

    /// Snapshot of every edge.
    pub fn connections(&self) -> Vec<BridgeConnection> {
        self.by_source.values().flatten().cloned().collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for edges in self.by_source.values() {
            stats.directed_edges += edges.len();
            stats.active_edges += edges.iter().filter(|e| e.is_active).count();
        }
        stats.channels = self.by_source.len();
        stats
    }

    fn remove_where(&mut self, source: &str, pred: impl Fn(&BridgeConnection) -> bool) -> usize {
        let Some(edges) = self.by_source.get_mut(source) else {
            return 0;
        };
        let before = edges.len();
        edges.retain(|e| !pred(e));
        let removed = before - edges.len();
        if edges.is_empty() {
            self.by_source.remove(source);
        }
        removed
    }

    fn retain(&mut self, keep: impl Fn(&BridgeConnection) -> bool) -> usize {
        let before = self.len();
        for edges in self.by_source.values_mut() {
            edges.retain(|e| keep(e));
        }
        self.by_source.retain(|_, edges| !edges.is_empty());
        before - self.len()
    }
}

fn mapping_ref(mapping: &RoomMapping) -> ChannelRef {
    ChannelRef::new(mapping.platform, mapping.platform_channel_id.clone())
}
