//! Snapshot persistence for the cache.
//!
//! The whole [`Store`] (minus dirty marks) is serialized to JSON and
//! written under one key per installation. Dirty marks go under a second
//! `:pending` key so edits that never reached the server survive a cold
//! start. A SHA256 content hash skips writes when nothing changed since
//! the last save.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::error::Result;
use crate::storage::schema::apply_schema;
use crate::storage::store::{DirtyState, Store};

/// Key under which one installation's snapshot is stored.
#[must_use]
pub fn storage_key(installation_id: &str) -> String {
    format!("aro-app-{installation_id}")
}

/// Key under which one installation's unpushed dirty marks are stored.
#[must_use]
pub fn pending_key(installation_id: &str) -> String {
    format!("{}:pending", storage_key(installation_id))
}

/// SHA256 of a serialized snapshot, hex encoded.
#[must_use]
pub fn content_hash(json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Minimal string key-value backend.
pub trait KeyValueStore {
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed key-value store.
#[derive(Debug)]
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    /// Open (or create) a state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, content_hash, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                content_hash(value),
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Loads and saves [`Store`] snapshots and their dirty marks.
#[derive(Debug)]
pub struct Persister<K: KeyValueStore> {
    kv: K,
    key: String,
    pending_key: String,
    last_hash: Option<String>,
    last_pending_hash: Option<String>,
}

impl<K: KeyValueStore> Persister<K> {
    pub fn new(kv: K, installation_id: &str) -> Self {
        Self {
            kv,
            key: storage_key(installation_id),
            pending_key: pending_key(installation_id),
            last_hash: None,
            last_pending_hash: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted snapshot, or an empty store if none exists.
    ///
    /// Saved dirty marks are restored, and entities that only exist
    /// locally are re-marked dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the snapshot is corrupt.
    pub fn load(&mut self) -> Result<Store> {
        let Some(json) = self.kv.get(&self.key)? else {
            debug!(key = %self.key, "No persisted snapshot, starting empty");
            return Ok(Store::new());
        };

        let mut store: Store = serde_json::from_str(&json)?;
        self.last_hash = Some(content_hash(&json));

        if let Some(pending) = self.kv.get(&self.pending_key)? {
            let dirty: DirtyState = serde_json::from_str(&pending)?;
            store.restore_dirty(dirty);
            self.last_pending_hash = Some(content_hash(&pending));
        }
        store.rehydrate();

        debug!(
            key = %self.key,
            workouts = store.workouts().len(),
            clean = store.dirty().is_clean(),
            "Loaded snapshot"
        );
        Ok(store)
    }

    /// Persist `store` and its dirty marks. Returns false when neither
    /// changed since the last save.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save(&mut self, store: &Store) -> Result<bool> {
        let json = serde_json::to_string(store)?;
        let wrote_snapshot = Self::write_if_changed(&self.kv, &self.key, &json, &mut self.last_hash)?;

        let pending = serde_json::to_string(store.dirty())?;
        let wrote_pending =
            Self::write_if_changed(&self.kv, &self.pending_key, &pending, &mut self.last_pending_hash)?;

        Ok(wrote_snapshot || wrote_pending)
    }

    fn write_if_changed(kv: &K, key: &str, value: &str, last_hash: &mut Option<String>) -> Result<bool> {
        let hash = content_hash(value);
        if last_hash.as_deref() == Some(hash.as_str()) {
            trace!(key, "Unchanged, skipping write");
            return Ok(false);
        }

        kv.set(key, value)?;
        *last_hash = Some(hash);
        Ok(true)
    }

    /// Delete the persisted snapshot and its dirty marks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear(&mut self) -> Result<()> {
        self.kv.remove(&self.key)?;
        self.kv.remove(&self.pending_key)?;
        self.last_hash = None;
        self.last_pending_hash = None;
        Ok(())
    }
}
