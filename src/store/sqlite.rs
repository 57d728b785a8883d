//! SQLite persistence layer.
//!
//! Stores rooms, per-platform room mappings and per-room bridge config.
//! The `users`, `user_mappings`, `messages` and `message_mappings` tables
//! are created for forward compatibility but not written by the bridge.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::common::error::{BridgeError, StoreError, StoreResult};
use crate::common::types::{ChannelKind, Platform};

use super::models::{room_name, BridgeConfig, ChannelRef, PersistedBridge, Room, RoomMapping};
use super::RoomStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at  DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at  DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS user_mappings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL,
    platform         TEXT NOT NULL CHECK (platform IN ('discord', 'telegram')),
    platform_user_id TEXT NOT NULL,
    username         TEXT NOT NULL DEFAULT '',
    display_name     TEXT NOT NULL DEFAULT '',
    avatar_url       TEXT NOT NULL DEFAULT '',
    is_active        BOOLEAN NOT NULL DEFAULT 1,
    created_at       DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at       DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    UNIQUE(platform, platform_user_id)
);

CREATE TABLE IF NOT EXISTS rooms (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL DEFAULT '',
    created_at  DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at  DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS room_mappings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id          INTEGER NOT NULL,
    platform         TEXT NOT NULL CHECK (platform IN ('discord', 'telegram')),
    platform_room_id TEXT NOT NULL,
    room_name        TEXT NOT NULL DEFAULT '',
    room_type        TEXT NOT NULL DEFAULT 'channel',
    is_active        BOOLEAN NOT NULL DEFAULT 1,
    created_at       DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at       DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE,
    UNIQUE(platform, platform_room_id)
);

CREATE TABLE IF NOT EXISTS messages (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    original_id     TEXT NOT NULL,
    source_platform TEXT NOT NULL CHECK (source_platform IN ('discord', 'telegram')),
    source_room_id  TEXT NOT NULL,
    source_user_id  TEXT NOT NULL,
    content         TEXT NOT NULL DEFAULT '',
    message_type    TEXT NOT NULL DEFAULT 'text',
    media_url       TEXT NOT NULL DEFAULT '',
    media_mime_type TEXT NOT NULL DEFAULT '',
    reply_to_id     INTEGER,
    is_edited       BOOLEAN NOT NULL DEFAULT 0,
    is_deleted      BOOLEAN NOT NULL DEFAULT 0,
    created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (reply_to_id) REFERENCES messages(id),
    UNIQUE(source_platform, original_id)
);

CREATE TABLE IF NOT EXISTS message_mappings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id       INTEGER NOT NULL,
    platform         TEXT NOT NULL CHECK (platform IN ('discord', 'telegram')),
    platform_msg_id  TEXT NOT NULL,
    platform_room_id TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',
    created_at       DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at       DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE,
    UNIQUE(platform, platform_msg_id)
);

CREATE TABLE IF NOT EXISTS bridge_config (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id            INTEGER NOT NULL,
    is_active          BOOLEAN NOT NULL DEFAULT 1,
    allow_media        BOOLEAN NOT NULL DEFAULT 1,
    allow_edits        BOOLEAN NOT NULL DEFAULT 1,
    allow_deletes      BOOLEAN NOT NULL DEFAULT 1,
    filter_words       TEXT NOT NULL DEFAULT '[]',
    max_message_length INTEGER NOT NULL DEFAULT 4000,
    created_at         DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at         DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE,
    UNIQUE(room_id)
);

CREATE INDEX IF NOT EXISTS idx_user_mappings_platform_user_id
    ON user_mappings(platform, platform_user_id);
CREATE INDEX IF NOT EXISTS idx_room_mappings_platform_room_id
    ON room_mappings(platform, platform_room_id);
CREATE INDEX IF NOT EXISTS idx_room_mappings_room_id
    ON room_mappings(room_id, is_active);
CREATE INDEX IF NOT EXISTS idx_messages_source
    ON messages(source_platform, source_room_id);
CREATE INDEX IF NOT EXISTS idx_message_mappings_platform
    ON message_mappings(platform, platform_msg_id);
CREATE INDEX IF NOT EXISTS idx_messages_created_at
    ON messages(created_at);
";

const MAPPING_COLUMNS: &str =
    "id, room_id, platform, platform_room_id, room_name, room_type, is_active, created_at, updated_at";

const CONFIG_COLUMNS: &str = "id, room_id, is_active, allow_media, allow_edits, allow_deletes, \
     filter_words, max_message_length, created_at, updated_at";

impl ToSql for Platform {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Platform {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: BridgeError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for ChannelKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChannelKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(ChannelKind::from_db(value.as_str()?))
    }
}

/// SQLite-backed room store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    ///
    /// Creates the parent directory if needed and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        debug!("Database schema applied");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Task {
            message: "database connection lock poisoned".to_string(),
        })
    }
}

impl RoomStore for SqliteStore {
    fn create_or_get_room(&self, name: &str) -> StoreResult<Room> {
        create_or_get_room(&*self.lock()?, name)
    }

    fn create_or_get_room_mapping(
        &self,
        room_id: i64,
        platform: Platform,
        channel_id: &str,
        label: &str,
        kind: ChannelKind,
    ) -> StoreResult<RoomMapping> {
        upsert_room_mapping(&*self.lock()?, room_id, platform, channel_id, label, kind)
    }

    fn get_room_mapping_by_platform_channel(
        &self,
        platform: Platform,
        channel_id: &str,
    ) -> StoreResult<Option<RoomMapping>> {
        find_active_mapping(&*self.lock()?, platform, channel_id)
    }

    fn get_active_room_mappings(&self, room_id: i64) -> StoreResult<Vec<RoomMapping>> {
        active_room_mappings(&*self.lock()?, room_id)
    }

    fn deactivate_room_mapping(&self, room_id: i64, platform: Platform) -> StoreResult<usize> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE room_mappings SET is_active = 0, updated_at = ?1
             WHERE room_id = ?2 AND platform = ?3 AND is_active = 1",
            params![Utc::now(), room_id, platform],
        )?;
        debug!(room_id, %platform, changed, "Deactivated room mappings");
        Ok(changed)
    }

    fn create_or_get_bridge_config(&self, room_id: i64) -> StoreResult<BridgeConfig> {
        create_or_get_bridge_config(&*self.lock()?, room_id)
    }

    fn update_bridge_config(&self, config: &BridgeConfig) -> StoreResult<()> {
        let filter_words =
            serde_json::to_string(&config.filter_words).map_err(|source| StoreError::Encode {
                column: "filter_words",
                source,
            })?;
        self.lock()?.execute(
            "UPDATE bridge_config SET is_active = ?1, allow_media = ?2, allow_edits = ?3,
                 allow_deletes = ?4, filter_words = ?5, max_message_length = ?6, updated_at = ?7
             WHERE room_id = ?8",
            params![
                config.is_active,
                config.allow_media,
                config.allow_edits,
                config.allow_deletes,
                filter_words,
                config.max_message_length,
                Utc::now(),
                config.room_id,
            ],
        )?;
        Ok(())
    }

    fn get_all_active_bridged_mappings(&self) -> StoreResult<BTreeMap<i64, Vec<RoomMapping>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT rm.id, rm.room_id, rm.platform, rm.platform_room_id, rm.room_name,
                    rm.room_type, rm.is_active, rm.created_at, rm.updated_at
             FROM room_mappings rm
             INNER JOIN bridge_config bc ON rm.room_id = bc.room_id
             WHERE rm.is_active = 1 AND bc.is_active = 1
             ORDER BY rm.room_id, rm.platform, rm.platform_room_id",
        )?;

        let mut rooms: BTreeMap<i64, Vec<RoomMapping>> = BTreeMap::new();
        for mapping in stmt.query_map([], mapping_from_row)? {
            let mapping = mapping?;
            rooms.entry(mapping.room_id).or_default().push(mapping);
        }
        Ok(rooms)
    }

    fn persist_bridge(
        &self,
        source: &ChannelRef,
        target: &ChannelRef,
    ) -> StoreResult<PersistedBridge> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing_room = match find_active_mapping(&tx, source.platform, &source.channel_id)? {
            Some(mapping) => Some(mapping.room_id),
            None => find_active_mapping(&tx, target.platform, &target.channel_id)?
                .map(|mapping| mapping.room_id),
        };

        let room = match existing_room {
            Some(room_id) => get_room(&tx, room_id)?,
            None => create_or_get_room(&tx, &room_name(source, target))?,
        };

        for end in [source, target] {
            upsert_room_mapping(
                &tx,
                room.id,
                end.platform,
                &end.channel_id,
                &end.label(),
                ChannelKind::Channel,
            )?;
        }

        let mut config = create_or_get_bridge_config(&tx, room.id)?;
        if !config.is_active {
            tx.execute(
                "UPDATE bridge_config SET is_active = 1, updated_at = ?1 WHERE room_id = ?2",
                params![Utc::now(), room.id],
            )?;
            config.is_active = true;
        }

        let members = active_room_mappings(&tx, room.id)?;
        tx.commit()?;

        debug!(
            room_id = room.id,
            members = members.len(),
            "Persisted bridge {} <-> {}",
            source.label(),
            target.label()
        );

        Ok(PersistedBridge {
            room,
            config,
            members,
        })
    }
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn mapping_from_row(row: &Row<'_>) -> rusqlite::Result<RoomMapping> {
    Ok(RoomMapping {
        id: row.get(0)?,
        room_id: row.get(1)?,
        platform: row.get(2)?,
        platform_channel_id: row.get(3)?,
        label: row.get(4)?,
        kind: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn config_from_row(row: &Row<'_>) -> rusqlite::Result<BridgeConfig> {
    let raw_words: String = row.get(6)?;
    let filter_words = serde_json::from_str(&raw_words)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(BridgeConfig {
        id: row.get(0)?,
        room_id: row.get(1)?,
        is_active: row.get(2)?,
        allow_media: row.get(3)?,
        allow_edits: row.get(4)?,
        allow_deletes: row.get(5)?,
        filter_words,
        max_message_length: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn get_room(conn: &Connection, room_id: i64) -> StoreResult<Room> {
    Ok(conn.query_row(
        "SELECT id, name, created_at, updated_at FROM rooms WHERE id = ?1",
        params![room_id],
        room_from_row,
    )?)
}

fn create_or_get_room(conn: &Connection, name: &str) -> StoreResult<Room> {
    let existing = conn
        .query_row(
            "SELECT id, name, created_at, updated_at FROM rooms WHERE name = ?1",
            params![name],
            room_from_row,
        )
        .optional()?;
    if let Some(room) = existing {
        return Ok(room);
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO rooms (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![name, now],
    )?;
    let room = Room {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    };
    info!(room_id = room.id, name, "Created room");
    Ok(room)
}

fn upsert_room_mapping(
    conn: &Connection,
    room_id: i64,
    platform: Platform,
    channel_id: &str,
    label: &str,
    kind: ChannelKind,
) -> StoreResult<RoomMapping> {
    conn.execute(
        "INSERT INTO room_mappings
             (room_id, platform, platform_room_id, room_name, room_type, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
         ON CONFLICT(platform, platform_room_id) DO UPDATE SET
             room_id = excluded.room_id,
             room_name = excluded.room_name,
             room_type = excluded.room_type,
             is_active = 1,
             updated_at = excluded.updated_at",
        params![room_id, platform, channel_id, label, kind, Utc::now()],
    )?;

    Ok(conn.query_row(
        &format!(
            "SELECT {} FROM room_mappings WHERE platform = ?1 AND platform_room_id = ?2",
            MAPPING_COLUMNS
        ),
        params![platform, channel_id],
        mapping_from_row,
    )?)
}

fn find_active_mapping(
    conn: &Connection,
    platform: Platform,
    channel_id: &str,
) -> StoreResult<Option<RoomMapping>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM room_mappings
                 WHERE platform = ?1 AND platform_room_id = ?2 AND is_active = 1",
                MAPPING_COLUMNS
            ),
            params![platform, channel_id],
            mapping_from_row,
        )
        .optional()?)
}

fn active_room_mappings(conn: &Connection, room_id: i64) -> StoreResult<Vec<RoomMapping>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM room_mappings
         WHERE room_id = ?1 AND is_active = 1
         ORDER BY platform, platform_room_id",
        MAPPING_COLUMNS
    ))?;
    let mappings = stmt
        .query_map(params![room_id], mapping_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(mappings)
}

fn create_or_get_bridge_config(conn: &Connection, room_id: i64) -> StoreResult<BridgeConfig> {
    let select = format!("SELECT {} FROM bridge_config WHERE room_id = ?1", CONFIG_COLUMNS);
    if let Some(config) = conn
        .query_row(&select, params![room_id], config_from_row)
        .optional()?
    {
        return Ok(config);
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO bridge_config (room_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![room_id, now],
    )?;
    Ok(conn.query_row(&select, params![room_id], config_from_row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::DEFAULT_MAX_MESSAGE_LENGTH;

    fn discord(channel: &str) -> ChannelRef {
        ChannelRef::new(Platform::Discord, channel)
    }

    fn telegram(channel: &str) -> ChannelRef {
        ChannelRef::new(Platform::Telegram, channel)
    }

    #[test]
    fn test_create_or_get_room_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.create_or_get_room("general").unwrap();
        let second = store.create_or_get_room("general").unwrap();
        assert_eq!(first.id, second.id);

        let other = store.create_or_get_room("random").unwrap();
        assert_ne!(first.id, other.id);
    }

    #[test]
    fn test_bridge_config_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        let room = store.create_or_get_room("r").unwrap();
        let config = store.create_or_get_bridge_config(room.id).unwrap();

        assert!(config.is_active);
        assert!(config.allow_media);
        assert!(config.allow_edits);
        assert!(config.allow_deletes);
        assert!(config.filter_words.is_empty());
        assert_eq!(config.max_message_length, DEFAULT_MAX_MESSAGE_LENGTH);

        // Second call returns the same row.
        let again = store.create_or_get_bridge_config(room.id).unwrap();
        assert_eq!(again.id, config.id);
    }

    #[test]
    fn test_update_bridge_config_round_trips_filter_words() {
        let store = SqliteStore::open_in_memory().unwrap();
        let room = store.create_or_get_room("r").unwrap();
        let mut config = store.create_or_get_bridge_config(room.id).unwrap();
        config.filter_words = vec!["spam".to_string(), "scam".to_string()];
        config.max_message_length = 500;
        store.update_bridge_config(&config).unwrap();

        let stored = store.create_or_get_bridge_config(room.id).unwrap();
        assert_eq!(stored.filter_words, vec!["spam", "scam"]);
        assert_eq!(stored.max_message_length, 500);
    }

    #[test]
    fn test_mapping_upsert_reactivates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let room = store.create_or_get_room("r").unwrap();
        store
            .create_or_get_room_mapping(room.id, Platform::Discord, "100", "a", ChannelKind::Channel)
            .unwrap();
        assert_eq!(store.deactivate_room_mapping(room.id, Platform::Discord).unwrap(), 1);
        assert!(store
            .get_room_mapping_by_platform_channel(Platform::Discord, "100")
            .unwrap()
            .is_none());

        let mapping = store
            .create_or_get_room_mapping(room.id, Platform::Discord, "100", "b", ChannelKind::Group)
            .unwrap();
        assert!(mapping.is_active);
        assert_eq!(mapping.label, "b");
        assert_eq!(mapping.kind, ChannelKind::Group);
    }

    #[test]
    fn test_channel_belongs_to_one_room() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.create_or_get_room("a").unwrap();
        let b = store.create_or_get_room("b").unwrap();
        store
            .create_or_get_room_mapping(a.id, Platform::Telegram, "200", "", ChannelKind::Channel)
            .unwrap();
        let moved = store
            .create_or_get_room_mapping(b.id, Platform::Telegram, "200", "", ChannelKind::Channel)
            .unwrap();

        assert_eq!(moved.room_id, b.id);
        assert!(store.get_active_room_mappings(a.id).unwrap().is_empty());
        assert_eq!(store.get_active_room_mappings(b.id).unwrap().len(), 1);

        let found = store
            .get_room_mapping_by_platform_channel(Platform::Telegram, "200")
            .unwrap()
            .unwrap();
        assert_eq!(found.room_id, b.id);
    }

    #[test]
    fn test_platform_check_constraint() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO room_mappings (room_id, platform, platform_room_id) VALUES (1, 'irc', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_persist_bridge_creates_room_and_mappings() {
        let store = SqliteStore::open_in_memory().unwrap();
        let persisted = store.persist_bridge(&discord("100"), &telegram("200")).unwrap();

        assert_eq!(persisted.room.name, "bridge_discord_100_telegram_200");
        assert!(persisted.config.is_active);
        assert_eq!(persisted.members.len(), 2);

        let grouped = store.get_all_active_bridged_mappings().unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&persisted.room.id].len(), 2);
    }

    #[test]
    fn test_persist_bridge_joins_existing_room() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.persist_bridge(&discord("100"), &telegram("200")).unwrap();
        let second = store.persist_bridge(&discord("100"), &telegram("300")).unwrap();

        assert_eq!(first.room.id, second.room.id);
        assert_eq!(second.members.len(), 3);
    }

    #[test]
    fn test_persist_bridge_reactivates_after_removal() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.persist_bridge(&discord("100"), &telegram("200")).unwrap();
        store
            .deactivate_room_mapping(first.room.id, Platform::Telegram)
            .unwrap();
        assert_eq!(store.get_active_room_mappings(first.room.id).unwrap().len(), 1);

        let again = store.persist_bridge(&discord("100"), &telegram("200")).unwrap();
        assert_eq!(again.room.id, first.room.id);
        assert_eq!(again.members.len(), 2);
    }

    #[test]
    fn test_inactive_config_excluded_from_active_bridges() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kept = store.persist_bridge(&discord("1"), &telegram("2")).unwrap();
        let paused = store.persist_bridge(&discord("3"), &telegram("4")).unwrap();

        let mut config = paused.config.clone();
        config.is_active = false;
        store.update_bridge_config(&config).unwrap();

        let grouped = store.get_all_active_bridged_mappings().unwrap();
        assert!(grouped.contains_key(&kept.room.id));
        assert!(!grouped.contains_key(&paused.room.id));
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bridge.db");

        let room_id = {
            let store = SqliteStore::open(&path).unwrap();
            store.persist_bridge(&discord("100"), &telegram("200")).unwrap().room.id
        };

        let reopened = SqliteStore::open(&path).unwrap();
        let grouped = reopened.get_all_active_bridged_mappings().unwrap();
        assert_eq!(grouped[&room_id].len(), 2);
    }
}
