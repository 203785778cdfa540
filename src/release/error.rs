use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Failed to serialize artifact: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, DNS or connection failure, or a non-2xx status
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The release feed already failed earlier in the same cycle
    #[error("Release feed unavailable: {0}")]
    FeedUnavailable(String),
}
