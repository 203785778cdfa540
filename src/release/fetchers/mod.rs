//! Fetcher implementations for release feeds

pub mod github;

pub use github::GitHubFetcher;
