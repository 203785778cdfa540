//! Plugin updater contract of the host
//!
//! The host keeps a transient listing available updates keyed by plugin file,
//! and asks for a details record when the user opens the update dialog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::release::changelog;
use crate::release::engine::{UpdateCheck, UpdateEngine};
use crate::release::semver::{CompareResult, compare_versions};
use crate::release::store::ArtifactStore;
use crate::release::types::{InstalledComponent, UpdateDescriptor};

/// Update state persisted by the host between checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateTransient {
    pub checked: Option<DateTime<Utc>>,
    /// Available updates keyed by plugin file
    pub response: BTreeMap<String, TransientEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientEntry {
    pub plugin: String,
    pub slug: String,
    pub new_version: String,
    pub url: String,
    pub package: String,
}

impl From<UpdateDescriptor> for TransientEntry {
    fn from(descriptor: UpdateDescriptor) -> Self {
        Self {
            plugin: descriptor.plugin_file,
            slug: descriptor.slug,
            new_version: descriptor.new_version,
            url: descriptor.url,
            package: descriptor.package_url,
        }
    }
}

/// Details record shown in the host's update dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub slug: String,
    /// Installed version
    pub version: String,
    pub new_version: String,
    pub author: String,
    pub homepage: String,
    pub requires: String,
    pub tested: String,
    /// `YYYY-MM-DD`
    pub last_updated: Option<String>,
    pub sections: Sections,
    pub download_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sections {
    pub description: String,
    pub changelog: String,
}

/// Merge the result of one evaluation cycle into the host transient
///
/// Only an available update changes the transient. Every other outcome,
/// including an undecidable one, returns it as received.
pub async fn check_for_updates<S: ArtifactStore>(
    engine: &UpdateEngine<S>,
    mut transient: UpdateTransient,
    installed: &InstalledComponent,
) -> UpdateTransient {
    match engine.evaluate(installed).await {
        UpdateCheck::Available(descriptor) => {
            info!(
                "Registering update {} for {}",
                descriptor.new_version, descriptor.plugin_file
            );
            let entry = TransientEntry::from(*descriptor);
            transient.response.insert(entry.plugin.clone(), entry);
        }
        UpdateCheck::NoDecision => debug!("Keeping transient unchanged"),
        UpdateCheck::UpToDate | UpdateCheck::Withheld { .. } => {}
    }

    transient
}

/// Build the details record for `requested_slug`
///
/// Returns `None` for other components' slugs and when the latest tag cannot
/// be determined.
pub async fn plugin_info<S: ArtifactStore>(
    engine: &UpdateEngine<S>,
    requested_slug: &str,
    installed: &InstalledComponent,
) -> Option<PluginInfo> {
    let config = engine.config();
    if requested_slug != config.slug {
        return None;
    }

    let details = engine.latest_release().await?;

    let last_updated = details
        .repository
        .as_ref()
        .and_then(|repository| repository.updated_at)
        .or(details.published_at)
        .map(|date| date.format("%Y-%m-%d").to_string());

    let mut sections = Sections {
        description: details
            .repository
            .and_then(|repository| repository.description)
            .unwrap_or_default(),
        changelog: details.changelog_html.unwrap_or_default(),
    };

    let is_installed =
        compare_versions(&installed.version, &details.new_version) == CompareResult::Latest;
    if !is_installed {
        sections.description = changelog::with_banner(details.maturity, &sections.description);
        sections.changelog = changelog::with_banner(details.maturity, &sections.changelog);
    }

    Some(PluginInfo {
        name: format!("{} {}", config.display_name, details.tag),
        slug: config.slug.clone(),
        version: installed.version.clone(),
        new_version: details.new_version,
        author: installed.author.clone(),
        homepage: installed.homepage.clone(),
        requires: config.requires.clone(),
        tested: config.tested.clone(),
        last_updated,
        sections,
        download_link: config.package_url(&details.tag),
    })
}
