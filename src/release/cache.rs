use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::release::error::CacheError;
use crate::release::store::{ArtifactStore, StoredArtifact};

/// Persistent artifact store backed by SQLite
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Cache initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expires_at ON artifacts(expires_at)",
            [],
        )?;

        // Kept apart from artifacts so a key can be refreshing before it has a value
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS refreshes (
                key TEXT PRIMARY KEY,
                started_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }
}

impl ArtifactStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<StoredArtifact>, CacheError> {
        let conn = self.lock_conn()?;
        let artifact = conn
            .query_row(
                "SELECT value, expires_at FROM artifacts WHERE key = ?1",
                [key],
                |row| {
                    Ok(StoredArtifact {
                        value: row.get(0)?,
                        expires_at: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(artifact)
    }

    fn put(&self, key: &str, value: &str, expires_at: i64) -> Result<(), CacheError> {
        debug!("Saving artifact {} (expires at {})", key, expires_at);

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO artifacts (key, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
            (key, value, expires_at),
        )?;

        Ok(())
    }

    fn try_start_refresh(
        &self,
        key: &str,
        now: i64,
        stale_before: i64,
    ) -> Result<bool, CacheError> {
        let conn = self.lock_conn()?;

        // Insert the marker, or take it over if the previous refresh timed out.
        // A live marker leaves the row untouched and reports zero changes.
        let rows_affected = conn.execute(
            r#"
            INSERT INTO refreshes (key, started_at)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET started_at = excluded.started_at
            WHERE refreshes.started_at < ?3
            "#,
            (key, now, stale_before),
        )?;

        Ok(rows_affected > 0)
    }

    fn finish_refresh(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM refreshes WHERE key = ?1", [key])?;
        Ok(())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM artifacts", [])?;
        tx.execute("DELETE FROM refreshes", [])?;
        tx.commit()?;

        info!("Cleared {} cached artifacts", removed);
        Ok(removed)
    }

    fn purge_expired(&self, now: i64) -> Result<usize, CacheError> {
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM artifacts WHERE expires_at < ?1", [now])?;

        debug!("Purged {} expired artifacts", removed);
        Ok(removed)
    }
}
