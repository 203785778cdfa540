//! Common types shared by the fetcher, cache and engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single entry of the remote release feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag: String,
    pub is_prerelease: bool,
    /// Missing for draft releases
    pub published_at: Option<DateTime<Utc>>,
    /// Raw markdown body
    pub body: String,
    pub description: String,
}

/// Repository metadata served by the API base URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub updated_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Stability level of a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Maturity {
    Stable,
    Beta,
    ReleaseCandidate,
}

impl Maturity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Maturity::Stable => "stable",
            Maturity::Beta => "beta",
            Maturity::ReleaseCandidate => "release_candidate",
        }
    }

    /// Whether this is a pre-release channel (beta or release candidate)
    pub fn is_prerelease(&self) -> bool {
        !matches!(self, Maturity::Stable)
    }
}

/// What the host knows about the installed copy of the tracked component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledComponent {
    pub version: String,
    pub author: String,
    pub homepage: String,
}

impl InstalledComponent {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }
}

/// Computed description of an available newer version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDescriptor {
    pub slug: String,
    pub plugin_file: String,
    pub current_version: String,
    /// Tag with the leading `v` stripped
    pub new_version: String,
    pub tag: String,
    /// Repository web URL
    pub url: String,
    pub package_url: String,
    pub last_updated: Option<NaiveDate>,
    /// Rendered changelog with the maturity banner prepended
    pub changelog_html: Option<String>,
    pub maturity: Maturity,
}
