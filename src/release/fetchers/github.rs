//! GitHub Releases API fetcher

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT_MS;
use crate::release::error::FetchError;
use crate::release::fetcher::ReleaseFetcher;
use crate::release::types::{ReleaseRecord, RepositoryInfo};

/// Response item from GitHub Releases API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    draft: bool,
}

impl From<Release> for ReleaseRecord {
    fn from(release: Release) -> Self {
        Self {
            tag: release.tag_name,
            is_prerelease: release.prerelease,
            published_at: release.published_at,
            body: release.body.unwrap_or_default(),
            description: release.name.unwrap_or_default(),
        }
    }
}

/// Response from GitHub repository API
#[derive(Debug, Deserialize)]
struct Repository {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    description: Option<String>,
}

/// Fetcher implementation for a single repository on the GitHub API
///
/// `api_url` is the repository endpoint, e.g.
/// `https://api.github.com/repos/WordPress/gutenberg`.
pub struct GitHubFetcher {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubFetcher {
    pub fn new(api_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("prerelease-watch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
        }

        Ok(response.error_for_status()?.text().await?)
    }
}

#[async_trait::async_trait]
impl ReleaseFetcher for GitHubFetcher {
    async fn fetch_releases(&self) -> Result<Vec<ReleaseRecord>, FetchError> {
        let url = format!("{}/releases", self.api_url);
        let body = self.get_text(&url).await?;

        let releases: Vec<Release> = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub releases response: {}", e);
            FetchError::MalformedResponse(e.to_string())
        })?;

        debug!("Fetched {} releases from {}", releases.len(), url);

        // Drafts are only visible to authenticated maintainers and have no
        // downloadable package yet
        Ok(releases
            .into_iter()
            .filter(|release| !release.draft)
            .map(ReleaseRecord::from)
            .collect())
    }

    async fn fetch_repository(&self) -> Result<RepositoryInfo, FetchError> {
        let body = self.get_text(&self.api_url).await?;

        let repository: Repository = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub repository response: {}", e);
            FetchError::MalformedResponse(e.to_string())
        })?;

        Ok(RepositoryInfo {
            updated_at: repository.updated_at,
            description: repository.description,
        })
    }
}
