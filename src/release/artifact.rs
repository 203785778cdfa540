//! Time-boxed artifact cache with refresh-on-miss
//!
//! Every artifact kind is cached independently under a key derived from the
//! tracked component's slug, so several components can share one backend.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::REFRESH_TIMEOUT_MS;
use crate::release::error::{CacheError, FetchError};
use crate::release::store::ArtifactStore;

/// Kinds of artifacts derived from the release feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Tag of the latest pre-release
    LatestTag,
    /// Publish date of the latest pre-release
    PublishedAt,
    /// Rendered changelog of the latest pre-release
    Changelog,
    /// Raw repository metadata
    RepositoryData,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::LatestTag => "latest_tag",
            ArtifactKind::PublishedAt => "latest_published_at",
            ArtifactKind::Changelog => "latest_changelog",
            ArtifactKind::RepositoryData => "github_data",
        }
    }
}

/// Derive the storage key for an artifact of a tracked component.
///
/// Lowercase hex SHA-256 of `{slug}_{kind}`.
pub fn cache_key(slug: &str, kind: ArtifactKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(slug.as_bytes());
    hasher.update(b"_");
    hasher.update(kind.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Source of the current time in milliseconds since UNIX epoch
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    /// Stored value within its TTL, no refresh attempted
    Fresh(T),
    /// Value produced by a successful refresh
    Refreshed(T),
    /// Prior value returned because the refresh failed or was already in flight
    Stale(T),
    /// Refresh succeeded but there was nothing to store
    Empty,
    /// Refresh failed and no prior value exists
    Unavailable,
}

impl<T> CacheLookup<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            CacheLookup::Fresh(value)
            | CacheLookup::Refreshed(value)
            | CacheLookup::Stale(value) => Some(value),
            CacheLookup::Empty | CacheLookup::Unavailable => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, CacheLookup::Stale(_))
    }
}

/// Artifact cache for a single tracked component
pub struct ArtifactCache<S: ArtifactStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    slug: String,
    ttl_ms: i64,
    force_refresh: bool,
}

impl<S: ArtifactStore> ArtifactCache<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        slug: &str,
        ttl: Duration,
        force_refresh: bool,
    ) -> Self {
        Self {
            store,
            clock,
            slug: slug.to_string(),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            force_refresh,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn force_refresh(&self) -> bool {
        self.force_refresh
    }

    /// Return the cached artifact, refreshing it when missing or expired
    ///
    /// `refresh` yields `Ok(None)` for a valid empty result, which is
    /// reported as [`CacheLookup::Empty`] and not stored. A failed refresh
    /// falls back to the prior value, expired or not.
    pub async fn get_or_refresh<T, F, Fut>(&self, kind: ArtifactKind, refresh: F) -> CacheLookup<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, FetchError>>,
    {
        let key = cache_key(&self.slug, kind);
        let now = self.clock.now_ms();

        let prior = match self.read::<T>(&key, kind) {
            Some((value, expires_at)) if !self.force_refresh && now < expires_at => {
                debug!("Cache hit for {}/{}", self.slug, kind.as_str());
                return CacheLookup::Fresh(value);
            }
            other => other.map(|(value, _)| value),
        };

        let started = self
            .store
            .try_start_refresh(&key, now, now.saturating_sub(REFRESH_TIMEOUT_MS))
            .inspect_err(|e| {
                warn!(
                    "Failed to start refresh for {}/{}: {}",
                    self.slug,
                    kind.as_str(),
                    e
                )
            })
            .unwrap_or(false);

        let prior = match prior {
            Some(value) if !started => {
                debug!(
                    "Refresh of {}/{} already in flight, returning prior value",
                    self.slug,
                    kind.as_str()
                );
                return CacheLookup::Stale(value);
            }
            other => other,
        };

        debug!("Refreshing {}/{}", self.slug, kind.as_str());
        let result = refresh().await;

        if started {
            let _ = self.store.finish_refresh(&key).inspect_err(|e| {
                warn!(
                    "Failed to finish refresh for {}/{}: {}",
                    self.slug,
                    kind.as_str(),
                    e
                )
            });
        }

        match result {
            Ok(Some(value)) => {
                self.write(&key, kind, &value);
                CacheLookup::Refreshed(value)
            }
            Ok(None) => {
                debug!("Refresh of {}/{} found nothing", self.slug, kind.as_str());
                CacheLookup::Empty
            }
            Err(e) => {
                warn!(
                    "Failed to refresh {}/{}: {}",
                    self.slug,
                    kind.as_str(),
                    e
                );
                match prior {
                    Some(value) => CacheLookup::Stale(value),
                    None => CacheLookup::Unavailable,
                }
            }
        }
    }

    /// Delete every cached artifact
    pub fn clear(&self) -> Result<usize, CacheError> {
        self.store.clear()
    }

    /// Delete artifacts whose TTL has passed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        self.store.purge_expired(self.clock.now_ms())
    }

    fn read<T: DeserializeOwned>(&self, key: &str, kind: ArtifactKind) -> Option<(T, i64)> {
        let stored = self
            .store
            .get(key)
            .inspect_err(|e| warn!("Failed to read {}/{}: {}", self.slug, kind.as_str(), e))
            .ok()??;

        serde_json::from_str(&stored.value)
            .inspect_err(|e| {
                warn!(
                    "Discarding undecodable artifact {}/{}: {}",
                    self.slug,
                    kind.as_str(),
                    e
                )
            })
            .ok()
            .map(|value| (value, stored.expires_at))
    }

    fn write<T: Serialize>(&self, key: &str, kind: ArtifactKind, value: &T) {
        let expires_at = self.clock.now_ms().saturating_add(self.ttl_ms);

        let result = serde_json::to_string(value)
            .map_err(CacheError::from)
            .and_then(|json| self.store.put(key, &json, expires_at));

        if let Err(e) = result {
            warn!("Failed to store {}/{}: {}", self.slug, kind.as_str(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::store::MemoryStore;
    use std::sync::atomic::AtomicUsize;

    const SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);

    fn create_cache(force_refresh: bool) -> (Arc<ManualClock>, ArtifactCache<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = ArtifactCache::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            "gutenberg",
            SIX_HOURS,
            force_refresh,
        );
        (clock, cache)
    }

    async fn ok(value: &str) -> Result<Option<String>, FetchError> {
        Ok(Some(value.to_string()))
    }

    async fn failing() -> Result<Option<String>, FetchError> {
        Err(FetchError::MalformedResponse("boom".to_string()))
    }

    #[test]
    fn cache_key_is_stable_hex_digest() {
        let key = cache_key("gutenberg", ArtifactKind::LatestTag);

        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, cache_key("gutenberg", ArtifactKind::LatestTag));
    }

    #[test]
    fn cache_key_differs_per_slug_and_kind() {
        let tag = cache_key("gutenberg", ArtifactKind::LatestTag);

        assert_ne!(tag, cache_key("gutenberg", ArtifactKind::Changelog));
        assert_ne!(tag, cache_key("classic-editor", ArtifactKind::LatestTag));
    }

    #[tokio::test]
    async fn get_or_refresh_does_not_refresh_within_ttl() {
        let (clock, cache) = create_cache(false);
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_refresh(ArtifactKind::LatestTag, || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok("v5.1-rc.1")
            })
            .await;
        clock.advance(SIX_HOURS - Duration::from_secs(1));
        let second = cache
            .get_or_refresh(ArtifactKind::LatestTag, || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok("v5.1-rc.2")
            })
            .await;

        assert_eq!(first, CacheLookup::Refreshed("v5.1-rc.1".to_string()));
        assert_eq!(second, CacheLookup::Fresh("v5.1-rc.1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_refresh_refreshes_after_expiry() {
        let (clock, cache) = create_cache(false);

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        clock.advance(SIX_HOURS);
        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.2"))
            .await;

        assert_eq!(lookup, CacheLookup::Refreshed("v5.1-rc.2".to_string()));
    }

    #[tokio::test]
    async fn get_or_refresh_always_refreshes_when_forced() {
        let (_clock, cache) = create_cache(true);

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.2"))
            .await;

        assert_eq!(lookup, CacheLookup::Refreshed("v5.1-rc.2".to_string()));
    }

    #[tokio::test]
    async fn get_or_refresh_returns_stale_value_when_refresh_fails() {
        let (clock, cache) = create_cache(false);

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        clock.advance(SIX_HOURS * 2);
        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, failing)
            .await;

        assert_eq!(lookup, CacheLookup::Stale("v5.1-rc.1".to_string()));
        assert!(lookup.is_stale());
    }

    #[tokio::test]
    async fn get_or_refresh_keeps_prior_value_after_failed_refresh() {
        let (clock, cache) = create_cache(false);

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        clock.advance(SIX_HOURS);
        cache.get_or_refresh(ArtifactKind::LatestTag, failing).await;
        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, failing)
            .await;

        assert_eq!(lookup, CacheLookup::Stale("v5.1-rc.1".to_string()));
    }

    #[tokio::test]
    async fn get_or_refresh_returns_unavailable_without_prior_value() {
        let (_clock, cache) = create_cache(false);

        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, failing)
            .await;

        assert_eq!(lookup, CacheLookup::Unavailable);
        assert_eq!(lookup.into_value(), None);
    }

    #[tokio::test]
    async fn get_or_refresh_reports_empty_and_stores_nothing() {
        let (_clock, cache) = create_cache(false);

        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, || async {
                Ok::<Option<String>, FetchError>(None)
            })
            .await;
        let key = cache_key("gutenberg", ArtifactKind::LatestTag);

        assert_eq!(lookup, CacheLookup::Empty);
        assert_eq!(cache.store().get(&key).unwrap(), None);
    }

    #[tokio::test]
    async fn get_or_refresh_returns_prior_value_while_refresh_in_flight() {
        let (clock, cache) = create_cache(false);

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        clock.advance(SIX_HOURS);

        let key = cache_key("gutenberg", ArtifactKind::LatestTag);
        let now = clock.now_ms();
        assert!(cache.store().try_start_refresh(&key, now, 0).unwrap());

        let calls = AtomicUsize::new(0);
        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok("v5.1-rc.2")
            })
            .await;

        assert_eq!(lookup, CacheLookup::Stale("v5.1-rc.1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overlapping_lookups_share_one_refresh() {
        let (clock, cache) = create_cache(false);
        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        clock.advance(SIX_HOURS);

        let calls = AtomicUsize::new(0);
        let refresh = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::task::yield_now().await;
                Ok::<_, FetchError>(Some("v5.1-rc.2".to_string()))
            }
        };

        // the first lookup is still refreshing when the second one runs
        let (first, second) = futures::join!(
            cache.get_or_refresh(ArtifactKind::LatestTag, refresh),
            cache.get_or_refresh(ArtifactKind::LatestTag, refresh),
        );

        assert_eq!(first, CacheLookup::Refreshed("v5.1-rc.2".to_string()));
        assert_eq!(second, CacheLookup::Stale("v5.1-rc.1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_refresh_saturates_oversized_ttl() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = ArtifactCache::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            "gutenberg",
            Duration::MAX,
            false,
        );

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        clock.advance(SIX_HOURS * 1_000);
        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.2"))
            .await;

        assert_eq!(lookup, CacheLookup::Fresh("v5.1-rc.1".to_string()));
    }

    #[tokio::test]
    async fn get_or_refresh_treats_undecodable_value_as_missing() {
        let (_clock, cache) = create_cache(false);
        let key = cache_key("gutenberg", ArtifactKind::LatestTag);
        cache.store().put(&key, "not json", i64::MAX).unwrap();

        let lookup = cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;

        assert_eq!(lookup, CacheLookup::Refreshed("v5.1-rc.1".to_string()));
    }

    #[tokio::test]
    async fn purge_expired_uses_cache_clock() {
        let (clock, cache) = create_cache(false);

        cache
            .get_or_refresh(ArtifactKind::LatestTag, || ok("v5.1-rc.1"))
            .await;
        assert_eq!(cache.purge_expired().unwrap(), 0);

        clock.advance(SIX_HOURS + Duration::from_secs(1));
        assert_eq!(cache.purge_expired().unwrap(), 1);
    }
}
