//! SQLite-backed key-value storage.
//!
//! Provides persistent storage for:
//! - The progress ledger snapshot (one record under a single key)
//! - Other small pieces of application state

use std::path::Path;

use rusqlite::{params, Connection};

use super::{data_dir, SnapshotStore};
use crate::error::{DatabaseError, Result};

/// Key the ledger snapshot is stored under.
pub const DEFAULT_SNAPSHOT_KEY: &str = "pomodoroData";

/// SQLite database holding the `kv` table.
pub struct Database {
    conn: Connection,
    snapshot_key: String,
}

impl Database {
    /// Open the database at `<data dir>/adaptodoro.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("adaptodoro.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn,
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Store the ledger snapshot under a different key.
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store. A single statement, so the old value is
    /// either fully replaced or left untouched.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool, rusqlite::Error> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

impl SnapshotStore for Database {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.kv_get(&self.snapshot_key)?)
    }

    fn save(&self, snapshot: &str) -> Result<()> {
        self.kv_set(&self.snapshot_key, snapshot)?;
        Ok(())
    }
}
