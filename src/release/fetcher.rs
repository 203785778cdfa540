//! Fetcher trait for reading the remote release feed

#[cfg(test)]
use mockall::automock;

use crate::release::error::FetchError;
use crate::release::types::{ReleaseRecord, RepositoryInfo};

/// Trait for querying the release feed of the tracked repository
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseFetcher: Send + Sync {
    /// Fetches the release list
    ///
    /// # Returns
    /// * `Ok(Vec<ReleaseRecord>)` - Releases in feed order (newest first)
    /// * `Err(FetchError)` - If the request or decoding fails
    async fn fetch_releases(&self) -> Result<Vec<ReleaseRecord>, FetchError>;

    /// Fetches repository metadata (last update time, description)
    async fn fetch_repository(&self) -> Result<RepositoryInfo, FetchError>;
}
