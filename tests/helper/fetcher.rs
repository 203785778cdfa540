//! Fetcher test utilities

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use prerelease_watch::release::error::FetchError;
use prerelease_watch::release::fetcher::ReleaseFetcher;
use prerelease_watch::release::types::{ReleaseRecord, RepositoryInfo};

/// Release fetcher serving a fixed feed and counting requests
#[derive(Default)]
pub struct StubFetcher {
    releases: Mutex<Vec<ReleaseRecord>>,
    repository: RepositoryInfo,
    failing: AtomicBool,
    release_calls: AtomicUsize,
    repository_calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new(releases: Vec<ReleaseRecord>) -> Self {
        Self {
            releases: Mutex::new(releases),
            ..Default::default()
        }
    }

    pub fn with_repository(mut self, repository: RepositoryInfo) -> Self {
        self.repository = repository;
        self
    }

    /// Replace the served feed
    pub fn publish(&self, releases: Vec<ReleaseRecord>) {
        *self.releases.lock().unwrap() = releases;
    }

    /// Make every following request fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn repository_calls(&self) -> usize {
        self.repository_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), FetchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::MalformedResponse("stub failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReleaseFetcher for StubFetcher {
    async fn fetch_releases(&self) -> Result<Vec<ReleaseRecord>, FetchError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.releases.lock().unwrap().clone())
    }

    async fn fetch_repository(&self) -> Result<RepositoryInfo, FetchError> {
        self.repository_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.repository.clone())
    }
}

/// A published pre-release with a one-line changelog
pub fn prerelease(tag: &str) -> ReleaseRecord {
    ReleaseRecord {
        tag: tag.to_string(),
        is_prerelease: true,
        published_at: Some(Utc.with_ymd_and_hms(2019, 2, 14, 9, 30, 0).unwrap()),
        body: format!("Changes in **{}**", tag),
        description: tag.to_string(),
    }
}

/// A published stable release
pub fn release(tag: &str) -> ReleaseRecord {
    ReleaseRecord {
        is_prerelease: false,
        ..prerelease(tag)
    }
}
