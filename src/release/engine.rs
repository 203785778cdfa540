//! Update decision engine
//!
//! Combines cached (or freshly fetched) release artifacts with the installed
//! version to decide whether a newer pre-release should be offered.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, TrackerConfig};
use crate::release::artifact::{ArtifactCache, ArtifactKind, CacheLookup, Clock};
use crate::release::changelog;
use crate::release::classifier::{classify_maturity, select_latest_prerelease};
use crate::release::error::FetchError;
use crate::release::fetcher::ReleaseFetcher;
use crate::release::semver::{CompareResult, compare_versions, strip_tag_prefix};
use crate::release::store::ArtifactStore;
use crate::release::types::{
    InstalledComponent, Maturity, ReleaseRecord, RepositoryInfo, UpdateDescriptor,
};

/// Terminal state of one evaluation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The latest tag could not be determined; keep the prior state
    NoDecision,
    /// No newer pre-release than the installed version
    UpToDate,
    /// A newer version exists but its maturity is not surfaced
    Withheld {
        new_version: String,
        maturity: Maturity,
    },
    Available(Box<UpdateDescriptor>),
}

/// Everything known about the latest pre-release, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDetails {
    pub tag: String,
    pub new_version: String,
    pub maturity: Maturity,
    pub published_at: Option<DateTime<Utc>>,
    /// Rendered changelog without the maturity banner
    pub changelog_html: Option<String>,
    pub repository: Option<RepositoryInfo>,
}

/// Release feed memoized for the duration of one cycle
///
/// Every artifact refresh in a cycle reads the same selected release, so the
/// feed is requested at most once per cycle. A failed request is remembered
/// too and fails the remaining refreshes of the cycle.
struct FeedCycle<'a> {
    fetcher: &'a dyn ReleaseFetcher,
    latest: OnceCell<Result<Option<ReleaseRecord>, String>>,
}

impl<'a> FeedCycle<'a> {
    fn new(fetcher: &'a dyn ReleaseFetcher) -> Self {
        Self {
            fetcher,
            latest: OnceCell::new(),
        }
    }

    async fn latest_prerelease(&self) -> Result<Option<ReleaseRecord>, FetchError> {
        let latest = self
            .latest
            .get_or_init(|| async move {
                let records = self
                    .fetcher
                    .fetch_releases()
                    .await
                    .inspect_err(|e| warn!("Failed to fetch release feed: {}", e))
                    .map_err(|e| e.to_string())?;

                let latest = select_latest_prerelease(&records).cloned();
                match &latest {
                    Some(record) => debug!("Latest pre-release in feed: {}", record.tag),
                    None => debug!("No pre-release among {} releases", records.len()),
                }
                Ok::<_, String>(latest)
            })
            .await;

        latest.clone().map_err(FetchError::FeedUnavailable)
    }
}

/// Decides whether a newer pre-release of the tracked component is available
///
/// One instance is built by the host at startup and shared (behind `Arc`)
/// by every request that needs it.
pub struct UpdateEngine<S: ArtifactStore> {
    config: TrackerConfig,
    fetcher: Arc<dyn ReleaseFetcher>,
    cache: ArtifactCache<S>,
}

impl<S: ArtifactStore> UpdateEngine<S> {
    pub fn new(
        config: TrackerConfig,
        fetcher: Arc<dyn ReleaseFetcher>,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if config.force_update {
            info!("Force update enabled, cache freshness checks are disabled");
        }

        let cache = ArtifactCache::new(
            store,
            clock,
            &config.slug,
            config.cache_ttl(),
            config.force_update,
        );

        Ok(Self {
            config,
            fetcher,
            cache,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache<S> {
        &self.cache
    }

    /// Run one evaluation cycle against the installed version
    #[instrument(skip_all, fields(slug = %self.config.slug, installed = %installed.version))]
    pub async fn evaluate(&self, installed: &InstalledComponent) -> UpdateCheck {
        let cycle = &FeedCycle::new(self.fetcher.as_ref());

        let tag = match self.latest_tag(cycle).await {
            CacheLookup::Fresh(tag) | CacheLookup::Refreshed(tag) | CacheLookup::Stale(tag) => {
                tag
            }
            CacheLookup::Empty => {
                info!("No pre-release published");
                return UpdateCheck::UpToDate;
            }
            CacheLookup::Unavailable => {
                warn!("Latest pre-release unknown, no decision this cycle");
                return UpdateCheck::NoDecision;
            }
        };

        let new_version = strip_tag_prefix(&tag).to_string();

        match compare_versions(&installed.version, &new_version) {
            CompareResult::Outdated => {}
            CompareResult::Latest | CompareResult::Newer => {
                debug!("Installed version is up to date with {}", new_version);
                return UpdateCheck::UpToDate;
            }
            CompareResult::Invalid => {
                warn!(
                    "Cannot compare installed {:?} with {:?}",
                    installed.version, new_version
                );
                return UpdateCheck::NoDecision;
            }
        }

        let maturity = classify_maturity(&new_version);
        if self.config.gate_on_maturity && !maturity.is_prerelease() {
            info!(
                "Withholding {} because it is not a beta or release candidate",
                new_version
            );
            return UpdateCheck::Withheld {
                new_version,
                maturity,
            };
        }

        let published_at = self.published_at(cycle).await.into_value();
        let changelog_html = self
            .changelog(cycle)
            .await
            .into_value()
            .map(|html| changelog::with_banner(maturity, &html));

        info!("Update available: {} -> {}", installed.version, new_version);

        UpdateCheck::Available(Box::new(UpdateDescriptor {
            slug: self.config.slug.clone(),
            plugin_file: self.config.plugin_file.clone(),
            current_version: installed.version.clone(),
            package_url: self.config.package_url(&tag),
            url: self.config.github_url.clone(),
            last_updated: published_at.map(|date| date.date_naive()),
            changelog_html,
            new_version,
            tag,
            maturity,
        }))
    }

    /// Collect the details of the latest pre-release, regardless of the
    /// installed version
    ///
    /// Returns `None` when no pre-release is published or the tag cannot be
    /// determined.
    #[instrument(skip_all, fields(slug = %self.config.slug))]
    pub async fn latest_release(&self) -> Option<ReleaseDetails> {
        let cycle = &FeedCycle::new(self.fetcher.as_ref());

        let tag = self.latest_tag(cycle).await.into_value()?;
        let new_version = strip_tag_prefix(&tag).to_string();

        Some(ReleaseDetails {
            maturity: classify_maturity(&new_version),
            published_at: self.published_at(cycle).await.into_value(),
            changelog_html: self.changelog(cycle).await.into_value(),
            repository: self.repository_info().await,
            new_version,
            tag,
        })
    }

    /// Cached repository metadata
    pub async fn repository_info(&self) -> Option<RepositoryInfo> {
        let fetcher = self.fetcher.as_ref();
        self.cache
            .get_or_refresh(ArtifactKind::RepositoryData, || async move {
                Ok::<_, FetchError>(Some(fetcher.fetch_repository().await?))
            })
            .await
            .into_value()
    }

    async fn latest_tag(&self, cycle: &FeedCycle<'_>) -> CacheLookup<String> {
        self.cache
            .get_or_refresh(ArtifactKind::LatestTag, || async move {
                Ok::<_, FetchError>(cycle.latest_prerelease().await?.map(|record| record.tag))
            })
            .await
    }

    async fn published_at(&self, cycle: &FeedCycle<'_>) -> CacheLookup<DateTime<Utc>> {
        self.cache
            .get_or_refresh(ArtifactKind::PublishedAt, || async move {
                Ok::<_, FetchError>(
                    cycle
                        .latest_prerelease()
                        .await?
                        .and_then(|record| record.published_at),
                )
            })
            .await
    }

    async fn changelog(&self, cycle: &FeedCycle<'_>) -> CacheLookup<String> {
        self.cache
            .get_or_refresh(ArtifactKind::Changelog, || async move {
                Ok::<_, FetchError>(
                    cycle
                        .latest_prerelease()
                        .await?
                        .map(|record| changelog::render(&record.body))
                        .filter(|html| !html.is_empty()),
                )
            })
            .await
    }
}
