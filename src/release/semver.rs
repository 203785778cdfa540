use std::cmp::Ordering;

use semver::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// Installed version equals the candidate
    Latest,
    /// Installed version is older than the candidate
    Outdated,
    /// Installed version is newer than the candidate
    Newer,
    Invalid,
}

/// Strip a single leading `v` from a release tag.
pub fn strip_tag_prefix(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Strips a leading 'v' and pads the numeric core with zeros while keeping
/// any pre-release or build suffix.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "5.1-beta1" -> Version(5, 1, 0, pre: "beta1")
pub fn parse_version(version: &str) -> Option<Version> {
    let version = strip_tag_prefix(version.trim());
    let (core, suffix) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0{}", parts[0], suffix),
        2 => format!("{}.{}.0{}", parts[0], parts[1], suffix),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Compare the installed version against a candidate version.
pub fn compare_versions(installed: &str, candidate: &str) -> CompareResult {
    let (Some(installed), Some(candidate)) = (parse_version(installed), parse_version(candidate))
    else {
        return CompareResult::Invalid;
    };

    match installed.cmp(&candidate) {
        Ordering::Equal => CompareResult::Latest,
        Ordering::Less => CompareResult::Outdated,
        Ordering::Greater => CompareResult::Newer,
    }
}
