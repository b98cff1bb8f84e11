//! Snapshot stores
//!
//! SQLite schema:
//!
//! ```sql
//! CREATE TABLE transport_snapshot (
//!     slot     TEXT PRIMARY KEY,
//!     payload  TEXT NOT NULL,   -- PlaybackSnapshot as JSON
//!     saved_at TEXT NOT NULL
//! )
//! ```
//!
//! Only the `current` slot is used; each save replaces it.

use crate::error::Result;
use crate::playback::PlaybackSnapshot;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const CURRENT_SLOT: &str = "current";

/// Where the session snapshot is kept
pub trait SnapshotStore: Send + Sync + 'static {
    /// Replace the stored snapshot
    fn save(&self, snapshot: &PlaybackSnapshot) -> impl Future<Output = Result<()>> + Send;

    /// Most recently saved snapshot, if any
    fn load_latest(&self) -> impl Future<Output = Result<Option<PlaybackSnapshot>>> + Send;
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    pool: Pool<Sqlite>,
}

impl SqliteSnapshotStore {
    /// Open (creating if needed) the database at `path`
    pub async fn connect(path: &Path) -> Result<Self> {
        cadence_common::config::ensure_parent_dir(path)?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        info!("Connected to database: {}", path.display());
        Self::from_pool(pool).await
    }

    /// Use an existing pool; creates the table if missing
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transport_snapshot (
                slot TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Remove the stored snapshot
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM transport_snapshot WHERE slot = ?")
            .bind(CURRENT_SLOT)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    async fn save(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO transport_snapshot (slot, payload, saved_at)
            VALUES (?, ?, ?)
            ON CONFLICT(slot) DO UPDATE SET
                payload = excluded.payload,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(CURRENT_SLOT)
        .bind(payload)
        .bind(snapshot.saved_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Saved session snapshot ({})", snapshot.status);
        Ok(())
    }

    async fn load_latest(&self) -> Result<Option<PlaybackSnapshot>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM transport_snapshot WHERE slot = ?")
                .bind(CURRENT_SLOT)
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

/// In-memory store, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<PlaybackSnapshot>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`
    pub fn with_snapshot(snapshot: PlaybackSnapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        *self.slot.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load_latest(&self) -> Result<Option<PlaybackSnapshot>> {
        Ok(self.slot.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{snapshot, MediaItem, PlaybackState};
    use cadence_common::events::PlaybackStatus;

    async fn setup_test_store() -> SqliteSnapshotStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteSnapshotStore::from_pool(pool).await.unwrap()
    }

    fn paused_snapshot(position_ms: u64) -> PlaybackSnapshot {
        let mut state = PlaybackState::new();
        state.set_status(PlaybackStatus::Paused);
        state.set_duration_ms(200_000);
        state.set_current_time_ms(position_ms).unwrap();
        let item = MediaItem::from_location("/music/a.flac");
        snapshot::save(&state, Some(&item), None)
    }

    #[tokio::test]
    async fn test_empty_store_has_no_snapshot() {
        let store = setup_test_store().await;
        assert_eq!(store.load_latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let store = setup_test_store().await;
        store.save(&paused_snapshot(10_000)).await.unwrap();
        let second = paused_snapshot(20_000);
        store.save(&second).await.unwrap();

        assert_eq!(store.load_latest().await.unwrap(), Some(second));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transport_snapshot")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_snapshot() {
        let store = setup_test_store().await;
        store.save(&paused_snapshot(10_000)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.load_latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_an_error() {
        let store = setup_test_store().await;
        sqlx::query("INSERT INTO transport_snapshot (slot, payload, saved_at) VALUES ('current', 'not json', '')")
            .execute(store.pool())
            .await
            .unwrap();
        assert!(store.load_latest().await.is_err());
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transport.db");

        let store = SqliteSnapshotStore::connect(&path).await.unwrap();
        store.save(&paused_snapshot(5_000)).await.unwrap();
        assert!(path.exists());

        let reopened = SqliteSnapshotStore::connect(&path).await.unwrap();
        let loaded = reopened.load_latest().await.unwrap().unwrap();
        assert_eq!(loaded.current_time_ms, 5_000);
    }

    #[tokio::test]
    async fn test_memory_store_shared_between_clones() {
        let store = MemorySnapshotStore::new();
        let other = store.clone();
        store.save(&paused_snapshot(1_000)).await.unwrap();
        assert_eq!(other.load_latest().await.unwrap().unwrap().current_time_ms, 1_000);
    }
}
