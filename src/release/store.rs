//! Storage backend trait for cached artifacts, plus a process-scoped backend

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::release::error::CacheError;

/// A serialized artifact as kept by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// JSON-encoded value
    pub value: String,
    /// Expiry timestamp in milliseconds since UNIX epoch
    pub expires_at: i64,
}

/// Trait for storing and retrieving cached artifacts
///
/// Backends are time-agnostic: every timestamp is supplied by the caller so
/// expiry stays under the control of the injected clock.
pub trait ArtifactStore: Send + Sync + 'static {
    /// Get the stored artifact for a key, expired or not
    fn get(&self, key: &str) -> Result<Option<StoredArtifact>, CacheError>;

    /// Store an artifact, replacing any prior value for the key
    fn put(&self, key: &str, value: &str, expires_at: i64) -> Result<(), CacheError>;

    /// Mark a refresh as in flight for the key
    ///
    /// Returns false when another refresh started after `stale_before` is
    /// still running.
    fn try_start_refresh(&self, key: &str, now: i64, stale_before: i64)
    -> Result<bool, CacheError>;

    /// Clear the in-flight marker for the key
    fn finish_refresh(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every artifact
    fn clear(&self) -> Result<usize, CacheError>;

    /// Delete artifacts that expired before `now`
    fn purge_expired(&self, now: i64) -> Result<usize, CacheError>;
}

#[derive(Debug, Default)]
struct MemoryEntry {
    artifact: Option<StoredArtifact>,
    refreshing_since: Option<i64>,
}

/// In-memory artifact store, scoped to the running process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryEntry>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

impl ArtifactStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredArtifact>, CacheError> {
        let entries = self.lock_entries()?;
        Ok(entries.get(key).and_then(|entry| entry.artifact.clone()))
    }

    fn put(&self, key: &str, value: &str, expires_at: i64) -> Result<(), CacheError> {
        let mut entries = self.lock_entries()?;
        entries.entry(key.to_string()).or_default().artifact = Some(StoredArtifact {
            value: value.to_string(),
            expires_at,
        });
        Ok(())
    }

    fn try_start_refresh(
        &self,
        key: &str,
        now: i64,
        stale_before: i64,
    ) -> Result<bool, CacheError> {
        let mut entries = self.lock_entries()?;
        let entry = entries.entry(key.to_string()).or_default();

        match entry.refreshing_since {
            Some(since) if since >= stale_before => Ok(false),
            _ => {
                entry.refreshing_since = Some(now);
                Ok(true)
            }
        }
    }

    fn finish_refresh(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.lock_entries()?;
        if let Some(entry) = entries.get_mut(key) {
            entry.refreshing_since = None;
        }
        Ok(())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.lock_entries()?;
        let removed = entries.values().filter(|e| e.artifact.is_some()).count();
        entries.clear();
        Ok(removed)
    }

    fn purge_expired(&self, now: i64) -> Result<usize, CacheError> {
        let mut entries = self.lock_entries()?;
        let mut removed = 0;
        for entry in entries.values_mut() {
            if entry.artifact.as_ref().is_some_and(|a| a.expires_at < now) {
                entry.artifact = None;
                removed += 1;
            }
        }
        entries.retain(|_, e| e.artifact.is_some() || e.refreshing_since.is_some());
        Ok(removed)
    }
}
