//! Durable local record store.
//!
//! [`LocalStore`] keeps everything the client must not lose while offline:
//! captured positions, cached rides, chat messages and the outbound action
//! queue. It is a single SQLite database guarded by a mutex; every operation
//! runs as one transaction, so readers never see a partial write.
//!
//! # Usage
//!
//! ```ignore
//! let store = LocalStore::open(&config.store.path)?;
//! let id = store.save_position(&sample)?;
//! let pending = store.list_unsynced()?;
//! store.mark_synced(&[id])?;
//! ```
//!
//! Timestamps are stored as Unix milliseconds.

mod error;
mod records;

pub use error::StoreError;
pub use records::{ActionKind, ChatMessage, PurgeReport, QueueItem, Ride, RideStatus, StoreStats};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::position::{PositionSample, RideId, StoredPosition, SyncState};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS positions (
        local_id    INTEGER PRIMARY KEY AUTOINCREMENT,
        ride_id     INTEGER NOT NULL,
        lat         REAL NOT NULL,
        lng         REAL NOT NULL,
        accuracy    REAL NOT NULL,
        heading     REAL,
        speed       REAL,
        captured_at INTEGER NOT NULL,
        sync_state  INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_positions_ride ON positions(ride_id);
    CREATE INDEX IF NOT EXISTS idx_positions_captured ON positions(captured_at);
    CREATE INDEX IF NOT EXISTS idx_positions_sync ON positions(sync_state);

    CREATE TABLE IF NOT EXISTS rides (
        id         INTEGER PRIMARY KEY,
        status     TEXT NOT NULL,
        payload    TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_rides_status ON rides(status);
    CREATE INDEX IF NOT EXISTS idx_rides_updated ON rides(updated_at);

    CREATE TABLE IF NOT EXISTS messages (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        ride_id    INTEGER NOT NULL,
        body       TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        sync_state INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_messages_ride ON messages(ride_id);
    CREATE INDEX IF NOT EXISTS idx_messages_sync ON messages(sync_state);

    CREATE TABLE IF NOT EXISTS queue (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        kind       TEXT NOT NULL,
        payload    TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        attempts   INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_queue_kind ON queue(kind);
    CREATE INDEX IF NOT EXISTS idx_queue_created ON queue(created_at);
";

const POSITION_COLUMNS: &str =
    "local_id, ride_id, lat, lng, accuracy, heading, speed, captured_at, sync_state";

/// Durable store shared by the coordinator and the sync engine.
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    durable: bool,
}

impl LocalStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self::bootstrap(conn, true)?;
        info!(path = %path.display(), "Local store opened");
        Ok(store)
    }

    /// Volatile store; contents are lost when the process exits.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?, false)
    }

    /// Open the file at `path`, falling back to memory if that fails.
    ///
    /// The error that forced the fallback is returned alongside the store.
    pub fn open_or_in_memory(path: &Path) -> Result<(Self, Option<StoreError>), StoreError> {
        match Self::open(path) {
            Ok(store) => Ok((store, None)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local store unavailable, using memory");
                Ok((Self::in_memory()?, Some(e)))
            }
        }
    }

    fn bootstrap(conn: Connection, durable: bool) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            durable,
        })
    }

    /// False for stores created by [`LocalStore::in_memory`].
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    /// Persist a sample as Pending and return its local id.
    pub fn save_position(&self, sample: &PositionSample) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO positions (ride_id, lat, lng, accuracy, heading, speed, captured_at, sync_state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sample.ride_id.0 as i64,
                sample.lat,
                sample.lng,
                sample.accuracy,
                sample.heading,
                sample.speed,
                sample.captured_at.timestamp_millis(),
                SyncState::Pending.as_i64(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All Pending positions ordered by capture time, then local id.
    pub fn list_unsynced(&self) -> Result<Vec<StoredPosition>, StoreError> {
        self.query_positions(
            &format!(
                "SELECT {} FROM positions WHERE sync_state = ?1 ORDER BY captured_at, local_id",
                POSITION_COLUMNS
            ),
            params![SyncState::Pending.as_i64()],
        )
    }

    /// Every stored position of one ride, oldest first.
    pub fn positions_for_ride(&self, ride_id: RideId) -> Result<Vec<StoredPosition>, StoreError> {
        self.query_positions(
            &format!(
                "SELECT {} FROM positions WHERE ride_id = ?1 ORDER BY captured_at, local_id",
                POSITION_COLUMNS
            ),
            params![ride_id.0 as i64],
        )
    }

    fn query_positions(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredPosition>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, map_position)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Mark positions Synced. Only Pending rows change, so repeating a call
    /// is harmless. Returns how many rows changed.
    pub fn mark_synced(&self, local_ids: &[i64]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE positions SET sync_state = ?1 WHERE local_id = ?2 AND sync_state = ?3",
            )?;
            for id in local_ids {
                changed += stmt.execute(params![
                    SyncState::Synced.as_i64(),
                    id,
                    SyncState::Pending.as_i64()
                ])?;
            }
        }
        tx.commit()?;
        debug!(requested = local_ids.len(), changed, "Positions marked synced");
        Ok(changed)
    }

    /// Delete Synced positions and messages older than `age`.
    ///
    /// Pending records are never touched.
    pub fn purge_older_than(&self, age: Duration) -> Result<PurgeReport, StoreError> {
        let cutoff = chrono::Duration::from_std(age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .map(|at| at.timestamp_millis())
            .unwrap_or(i64::MIN);
        self.purge_before(cutoff)
    }

    fn purge_before(&self, cutoff_ms: i64) -> Result<PurgeReport, StoreError> {
        let synced = SyncState::Synced.as_i64();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let positions = tx.execute(
            "DELETE FROM positions WHERE sync_state = ?1 AND captured_at < ?2",
            params![synced, cutoff_ms],
        )?;
        let messages = tx.execute(
            "DELETE FROM messages WHERE sync_state = ?1 AND created_at < ?2",
            params![synced, cutoff_ms],
        )?;
        tx.commit()?;

        let report = PurgeReport {
            positions,
            messages,
        };
        info!(positions, messages, "Purged synced records");
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Rides
    // ------------------------------------------------------------------

    /// Insert or replace a ride.
    pub fn save_ride(&self, ride: &Ride) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&ride.payload)?;
        self.conn.lock().execute(
            "INSERT INTO rides (id, status, payload, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status,
                 payload = excluded.payload, updated_at = excluded.updated_at",
            params![
                ride.id.0 as i64,
                ride.status.as_str(),
                payload,
                ride.updated_at.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    pub fn get_ride(&self, id: RideId) -> Result<Option<Ride>, StoreError> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT id, status, payload, updated_at FROM rides WHERE id = ?1",
                params![id.0 as i64],
                RawRide::from_row,
            )
            .optional()?;
        raw.map(RawRide::into_ride).transpose()
    }

    /// Rides with the given status, most recently updated first.
    pub fn rides_by_status(&self, status: RideStatus) -> Result<Vec<Ride>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, status, payload, updated_at FROM rides
             WHERE status = ?1 ORDER BY updated_at DESC",
        )?;
        let raws = stmt
            .query_map(params![status.as_str()], RawRide::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawRide::into_ride).collect()
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Store a message as Pending.
    pub fn save_message(&self, ride_id: RideId, body: &str) -> Result<ChatMessage, StoreError> {
        let created_at = now_millis();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (ride_id, body, created_at, sync_state) VALUES (?1, ?2, ?3, ?4)",
            params![
                ride_id.0 as i64,
                body,
                created_at.timestamp_millis(),
                SyncState::Pending.as_i64()
            ],
        )?;
        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            ride_id,
            body: body.to_string(),
            created_at,
            sync_state: SyncState::Pending,
        })
    }

    /// Pending messages, oldest first.
    pub fn unsynced_messages(&self) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, ride_id, body, created_at, sync_state FROM messages
             WHERE sync_state = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![SyncState::Pending.as_i64()], |row| {
            Ok(ChatMessage {
                id: row.get(0)?,
                ride_id: RideId(row.get::<_, i64>(1)? as u64),
                body: row.get(2)?,
                created_at: timestamp(row, 3)?,
                sync_state: SyncState::from_i64(row.get(4)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    pub fn mark_messages_synced(&self, ids: &[i64]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE messages SET sync_state = ?1 WHERE id = ?2 AND sync_state = ?3",
            )?;
            for id in ids {
                changed += stmt.execute(params![
                    SyncState::Synced.as_i64(),
                    id,
                    SyncState::Pending.as_i64()
                ])?;
            }
        }
        tx.commit()?;
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Outbound queue
    // ------------------------------------------------------------------

    /// Append an action to the outbound queue.
    pub fn enqueue(
        &self,
        kind: ActionKind,
        payload: serde_json::Value,
    ) -> Result<QueueItem, StoreError> {
        let created_at = now_millis();
        let encoded = serde_json::to_string(&payload)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO queue (kind, payload, created_at, attempts) VALUES (?1, ?2, ?3, 0)",
            params![kind.as_str(), encoded, created_at.timestamp_millis()],
        )?;
        let item = QueueItem {
            id: conn.last_insert_rowid(),
            kind,
            payload,
            created_at,
            attempts: 0,
        };
        debug!(id = item.id, kind = %kind, "Action queued");
        Ok(item)
    }

    /// Queued actions, oldest first.
    pub fn queue_items(&self) -> Result<Vec<QueueItem>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, kind, payload, created_at, attempts FROM queue ORDER BY created_at, id",
        )?;
        let raws = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    timestamp(row, 3)?,
                    row.get::<_, u32>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raws.into_iter()
            .map(|(id, kind, payload, created_at, attempts)| {
                Ok(QueueItem {
                    id,
                    kind: kind.parse().map_err(|reason| StoreError::Corrupt {
                        table: "queue",
                        reason,
                    })?,
                    payload: serde_json::from_str(&payload)?,
                    created_at,
                    attempts,
                })
            })
            .collect()
    }

    /// Write back an item's attempt count and payload.
    ///
    /// Returns false if the item no longer exists.
    pub fn update_queue_item(&self, item: &QueueItem) -> Result<bool, StoreError> {
        let payload = serde_json::to_string(&item.payload)?;
        let changed = self.conn.lock().execute(
            "UPDATE queue SET payload = ?1, attempts = ?2 WHERE id = ?3",
            params![payload, item.attempts, item.id],
        )?;
        Ok(changed > 0)
    }

    /// Remove an item. Returns false if it was already gone.
    pub fn remove_queue_item(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM queue WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn.lock();
        let count = |sql: &str, state: Option<i64>| -> Result<usize, rusqlite::Error> {
            let n: i64 = match state {
                Some(state) => conn.query_row(sql, params![state], |row| row.get(0))?,
                None => conn.query_row(sql, [], |row| row.get(0))?,
            };
            Ok(n.max(0) as usize)
        };

        let pending = SyncState::Pending.as_i64();
        let synced = SyncState::Synced.as_i64();
        Ok(StoreStats {
            pending_positions: count(
                "SELECT COUNT(*) FROM positions WHERE sync_state = ?1",
                Some(pending),
            )?,
            synced_positions: count(
                "SELECT COUNT(*) FROM positions WHERE sync_state = ?1",
                Some(synced),
            )?,
            queued_actions: count("SELECT COUNT(*) FROM queue", None)?,
            unsynced_messages: count(
                "SELECT COUNT(*) FROM messages WHERE sync_state = ?1",
                Some(pending),
            )?,
            rides: count("SELECT COUNT(*) FROM rides", None)?,
        })
    }
}

/// Ride row before its status and payload are decoded.
struct RawRide {
    id: i64,
    status: String,
    payload: String,
    updated_at: DateTime<Utc>,
}

impl RawRide {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            payload: row.get(2)?,
            updated_at: timestamp(row, 3)?,
        })
    }

    fn into_ride(self) -> Result<Ride, StoreError> {
        Ok(Ride {
            id: RideId(self.id as u64),
            status: self
                .status
                .parse()
                .map_err(|reason| StoreError::Corrupt {
                    table: "rides",
                    reason,
                })?,
            payload: serde_json::from_str(&self.payload)?,
            updated_at: self.updated_at,
        })
    }
}

fn map_position(row: &Row<'_>) -> rusqlite::Result<StoredPosition> {
    Ok(StoredPosition {
        local_id: row.get(0)?,
        sample: PositionSample {
            ride_id: RideId(row.get::<_, i64>(1)? as u64),
            lat: row.get(2)?,
            lng: row.get(3)?,
            accuracy: row.get(4)?,
            heading: row.get(5)?,
            speed: row.get(6)?,
            captured_at: timestamp(row, 7)?,
        },
        sync_state: SyncState::from_i64(row.get(8)?),
    })
}

/// Read a Unix-millisecond column as a UTC timestamp.
fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

/// Current time truncated to the millisecond precision the store keeps.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample(ride: u64, secs: i64) -> PositionSample {
        PositionSample {
            ride_id: RideId(ride),
            lat: 40.0 + secs as f64 * 0.0001,
            lng: -74.0,
            accuracy: 5.0,
            heading: Some(90.0),
            speed: Some(8.0),
            captured_at: Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let store = LocalStore::in_memory().unwrap();
        let original = sample(42, 0);

        let id = store.save_position(&original).unwrap();
        let pending = store.list_unsynced().unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_id, id);
        assert_eq!(pending[0].sample, original);
        assert_eq!(pending[0].sync_state, SyncState::Pending);
    }

    #[test]
    fn test_missing_velocity_survives_round_trip() {
        let store = LocalStore::in_memory().unwrap();
        let mut original = sample(1, 0);
        original.heading = None;
        original.speed = None;

        store.save_position(&original).unwrap();

        assert_eq!(store.list_unsynced().unwrap()[0].sample, original);
    }

    #[test]
    fn test_local_ids_are_monotonic() {
        let store = LocalStore::in_memory().unwrap();
        let a = store.save_position(&sample(1, 0)).unwrap();
        let b = store.save_position(&sample(1, 1)).unwrap();
        let c = store.save_position(&sample(2, 2)).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_list_unsynced_orders_by_capture_time() {
        let store = LocalStore::in_memory().unwrap();
        store.save_position(&sample(1, 30)).unwrap();
        store.save_position(&sample(1, 10)).unwrap();
        store.save_position(&sample(1, 20)).unwrap();

        let times: Vec<_> = store
            .list_unsynced()
            .unwrap()
            .iter()
            .map(|p| p.sample.captured_at.timestamp())
            .collect();

        assert_eq!(
            times,
            vec![1_714_564_810, 1_714_564_820, 1_714_564_830]
        );
    }

    #[test]
    fn test_mark_synced_is_idempotent() {
        let store = LocalStore::in_memory().unwrap();
        let a = store.save_position(&sample(1, 0)).unwrap();
        let b = store.save_position(&sample(1, 1)).unwrap();

        assert_eq!(store.mark_synced(&[a, b]).unwrap(), 2);
        assert_eq!(store.mark_synced(&[a, b]).unwrap(), 0);
        assert!(store.list_unsynced().unwrap().is_empty());

        let all = store.positions_for_ride(RideId(1)).unwrap();
        assert!(all.iter().all(|p| p.sync_state == SyncState::Synced));
    }

    #[test]
    fn test_purge_never_touches_pending() {
        let store = LocalStore::in_memory().unwrap();
        let old_synced = store.save_position(&sample(1, 0)).unwrap();
        store.save_position(&sample(1, 1)).unwrap();
        store.mark_synced(&[old_synced]).unwrap();

        let report = store.purge_older_than(Duration::from_secs(3600)).unwrap();

        assert_eq!(report.positions, 1);
        let remaining = store.positions_for_ride(RideId(1)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].sync_state, SyncState::Pending);
    }

    #[test]
    fn test_purge_keeps_recent_synced() {
        let store = LocalStore::in_memory().unwrap();
        let mut recent = sample(1, 0);
        recent.captured_at = Utc::now();
        let id = store.save_position(&recent).unwrap();
        store.mark_synced(&[id]).unwrap();

        let report = store.purge_older_than(Duration::from_secs(3600)).unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(store.stats().unwrap().synced_positions, 1);
    }

    #[test]
    fn test_rides_upsert_and_query_by_status() {
        let store = LocalStore::in_memory().unwrap();
        let mut ride = Ride {
            id: RideId(42),
            status: RideStatus::Accepted,
            payload: json!({"pickup": "Main St"}),
            updated_at: Utc.timestamp_opt(1_714_564_800, 0).unwrap(),
        };
        store.save_ride(&ride).unwrap();

        ride.status = RideStatus::InProgress;
        store.save_ride(&ride).unwrap();

        assert_eq!(store.get_ride(RideId(42)).unwrap(), Some(ride.clone()));
        assert!(store.rides_by_status(RideStatus::Accepted).unwrap().is_empty());
        assert_eq!(store.rides_by_status(RideStatus::InProgress).unwrap(), vec![ride]);
        assert!(store.get_ride(RideId(7)).unwrap().is_none());
    }

    #[test]
    fn test_messages_sync_state() {
        let store = LocalStore::in_memory().unwrap();
        let first = store.save_message(RideId(42), "on my way").unwrap();
        store.save_message(RideId(42), "outside").unwrap();

        assert_eq!(store.mark_messages_synced(&[first.id]).unwrap(), 1);

        let pending = store.unsynced_messages().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].body, "outside");
    }

    #[test]
    fn test_queue_lifecycle() {
        let store = LocalStore::in_memory().unwrap();
        let first = store
            .enqueue(ActionKind::StatusChange, json!({"ride_id": 42, "status": "completed"}))
            .unwrap();
        let second = store
            .enqueue(ActionKind::Message, json!({"ride_id": 42, "body": "thanks"}))
            .unwrap();

        let items = store.queue_items().unwrap();
        assert_eq!(items, vec![first.clone(), second.clone()]);

        let retried = first.with_failed_attempt();
        assert!(store.update_queue_item(&retried).unwrap());
        assert_eq!(store.queue_items().unwrap()[0].attempts, 1);

        assert!(store.remove_queue_item(second.id).unwrap());
        assert!(!store.remove_queue_item(second.id).unwrap());
        assert_eq!(store.queue_items().unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let store = LocalStore::in_memory().unwrap();
        let id = store.save_position(&sample(1, 0)).unwrap();
        store.save_position(&sample(1, 1)).unwrap();
        store.mark_synced(&[id]).unwrap();
        store.enqueue(ActionKind::Position, json!({})).unwrap();
        store.save_message(RideId(1), "hi").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                pending_positions: 1,
                synced_positions: 1,
                queued_actions: 1,
                unsynced_messages: 1,
                rides: 0,
            }
        );
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("ridetrack.db");

        {
            let store = LocalStore::open(&path).unwrap();
            assert!(store.is_durable());
            store.save_position(&sample(42, 0)).unwrap();
            store.enqueue(ActionKind::Message, json!({"body": "x"})).unwrap();
        }

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.list_unsynced().unwrap().len(), 1);
        assert_eq!(reopened.queue_items().unwrap().len(), 1);
    }

    #[test]
    fn test_open_or_in_memory_falls_back() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as a database file.
        let (store, error) = LocalStore::open_or_in_memory(temp_dir.path()).unwrap();

        assert!(error.is_some());
        assert!(!store.is_durable());
        store.save_position(&sample(1, 0)).unwrap();
    }
}
