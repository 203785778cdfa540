//! Release selection and maturity classification

use crate::release::types::{Maturity, ReleaseRecord};

/// Select the first pre-release in feed order
///
/// The feed is delivered newest first, so the first match is the latest
/// pre-release. Stable releases are never selected, even when newer.
pub fn select_latest_prerelease(records: &[ReleaseRecord]) -> Option<&ReleaseRecord> {
    records.iter().find(|record| record.is_prerelease)
}

/// Classify a version string by its substring markers
///
/// `beta` is checked before `rc`, so a string carrying both is a beta.
pub fn classify_maturity(version: &str) -> Maturity {
    if version.contains("beta") {
        Maturity::Beta
    } else if version.contains("rc") {
        Maturity::ReleaseCandidate
    } else {
        Maturity::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(tag: &str, is_prerelease: bool) -> ReleaseRecord {
        ReleaseRecord {
            tag: tag.to_string(),
            is_prerelease,
            published_at: None,
            body: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn select_latest_prerelease_returns_first_prerelease_in_feed_order() {
        let records = vec![
            record("v5.0", false),
            record("v5.1-rc.1", true),
            record("v5.0", false),
        ];

        let selected = select_latest_prerelease(&records).unwrap();

        assert_eq!(selected.tag, "v5.1-rc.1");
    }

    #[test]
    fn select_latest_prerelease_does_not_reorder_by_version() {
        let records = vec![
            record("v5.1-beta1", true),
            record("v5.2-beta1", true),
        ];

        let selected = select_latest_prerelease(&records).unwrap();

        assert_eq!(selected.tag, "v5.1-beta1");
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![record("v5.0", false), record("v4.9", false)])]
    fn select_latest_prerelease_returns_none_without_prereleases(
        #[case] records: Vec<ReleaseRecord>,
    ) {
        assert_eq!(select_latest_prerelease(&records), None);
    }

    #[rstest]
    #[case("5.1-beta1", Maturity::Beta)]
    #[case("v5.1.0-beta.2", Maturity::Beta)]
    #[case("5.1-rc.1", Maturity::ReleaseCandidate)]
    #[case("v5.1.0-rc2", Maturity::ReleaseCandidate)]
    #[case("5.1.0", Maturity::Stable)]
    #[case("5.1.0-alpha", Maturity::Stable)]
    #[case("5.1-beta-rc", Maturity::Beta)] // both markers: beta wins
    fn classify_maturity_returns_expected(#[case] version: &str, #[case] expected: Maturity) {
        assert_eq!(classify_maturity(version), expected);
    }
}
