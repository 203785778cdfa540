#![allow(dead_code)]

pub mod fetcher;

pub use fetcher::{StubFetcher, prerelease, release};

use std::sync::Arc;

use tempfile::TempDir;

use prerelease_watch::config::TrackerConfig;
use prerelease_watch::release::artifact::ManualClock;
use prerelease_watch::release::cache::SqliteStore;
use prerelease_watch::release::engine::UpdateEngine;
use prerelease_watch::release::fetcher::ReleaseFetcher;

/// Fixed starting point for test clocks (2019-02-12T19:46:40Z)
pub const TEST_NOW_MS: i64 = 1_550_000_000_000;

/// Create a SQLite store in a fresh temporary directory
pub fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&temp_dir.path().join("cache.db")).unwrap();
    (temp_dir, Arc::new(store))
}

/// Create an engine with default config over the given store and fetcher
pub fn create_test_engine(
    fetcher: Arc<dyn ReleaseFetcher>,
    store: Arc<SqliteStore>,
    clock: Arc<ManualClock>,
) -> UpdateEngine<SqliteStore> {
    create_engine_with_config(TrackerConfig::default(), fetcher, store, clock)
}

pub fn create_engine_with_config(
    config: TrackerConfig,
    fetcher: Arc<dyn ReleaseFetcher>,
    store: Arc<SqliteStore>,
    clock: Arc<ManualClock>,
) -> UpdateEngine<SqliteStore> {
    UpdateEngine::new(config, fetcher, store, clock).unwrap()
}
