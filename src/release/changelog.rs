//! Changelog rendering from release markdown to HTML

use pulldown_cmark::{Options, Parser, html};

use crate::release::types::Maturity;

const BETA_BANNER: &str =
    "<h1><span>&#9888;</span>This is a beta release<span>&#9888;</span></h1>";
const RELEASE_CANDIDATE_BANNER: &str =
    "<h1><span>&#9888;</span>This is a pre-release version<span>&#9888;</span></h1>";

/// Render a release body to HTML.
///
/// Supports CommonMark plus tables, strikethrough and task lists, which is
/// what GitHub release notes commonly use.
pub fn render(markdown: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Warning banner shown above each display section for the given maturity.
pub fn maturity_banner(maturity: Maturity) -> &'static str {
    match maturity {
        Maturity::Stable => "",
        Maturity::Beta => BETA_BANNER,
        Maturity::ReleaseCandidate => RELEASE_CANDIDATE_BANNER,
    }
}

/// Prepend the maturity banner to an already rendered section.
pub fn with_banner(maturity: Maturity, section: &str) -> String {
    format!("{}{}", maturity_banner(maturity), section)
}
