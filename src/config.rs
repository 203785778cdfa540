use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default artifact lifetime in seconds (6 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 6 * 60 * 60;

/// Timeout for a single request to the release feed in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Age after which an unfinished refresh no longer blocks others (2 minutes)
pub const REFRESH_TIMEOUT_MS: i64 = 2 * 60 * 1000;

/// Environment variable forcing every lookup to hit the network
pub const FORCE_UPDATE_ENV: &str = "PRERELEASE_WATCH_FORCE_UPDATE";

/// Environment variable holding the log filter directive
pub const LOG_FILTER_ENV: &str = "PRERELEASE_WATCH_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration of the tracked component
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Repository endpoint of the GitHub API
    pub api_url: String,
    /// Repository web URL, base of the package download URL
    pub github_url: String,
    pub slug: String,
    /// Plugin file path relative to the host's plugin directory
    pub plugin_file: String,
    pub display_name: String,
    /// Name of the zip asset attached to each release, without extension
    pub artifact_name: String,
    /// Minimum supported host version
    pub requires: String,
    /// Host version the component is tested up to
    pub tested: String,
    pub cache: CacheConfig,
    /// Only surface beta and release-candidate updates
    pub gate_on_maturity: bool,
    /// Bypass cache freshness checks on every lookup
    pub force_update: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com/repos/WordPress/gutenberg".to_string(),
            github_url: "https://github.com/WordPress/gutenberg".to_string(),
            slug: "gutenberg".to_string(),
            plugin_file: "gutenberg/gutenberg.php".to_string(),
            display_name: "Gutenberg".to_string(),
            artifact_name: "gutenberg".to_string(),
            requires: "4.5".to_string(),
            tested: "4.9.8".to_string(),
            cache: CacheConfig::default(),
            gate_on_maturity: true,
            force_update: false,
        }
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Artifact lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl TrackerConfig {
    /// Load, apply environment overrides and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply the operator override from the environment, if set
    pub fn with_env_overrides(self) -> Self {
        self.with_force_update_flag(std::env::var(FORCE_UPDATE_ENV).ok())
    }

    fn with_force_update_flag(mut self, flag: Option<String>) -> Self {
        if let Some(force) = flag.as_deref().and_then(parse_flag) {
            self.force_update = force;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("apiUrl", &self.api_url)?;
        validate_url("githubUrl", &self.github_url)?;

        if self.slug.is_empty() || self.slug.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "slug must be a non-empty word, got {:?}",
                self.slug
            )));
        }
        if self.plugin_file.is_empty() {
            return Err(ConfigError::Invalid("pluginFile must not be empty".to_string()));
        }
        if self.artifact_name.is_empty() || self.artifact_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "artifactName must be a plain file name, got {:?}",
                self.artifact_name
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.ttlSecs must be greater than zero".to_string(),
            ));
        }
        let ttl_ms = self
            .cache
            .ttl_secs
            .checked_mul(1000)
            .and_then(|ms| i64::try_from(ms).ok());
        if ttl_ms.is_none() {
            return Err(ConfigError::Invalid(format!(
                "cache.ttlSecs is too large, got {}",
                self.cache.ttl_secs
            )));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Download URL of the release asset for a tag
    pub fn package_url(&self, tag: &str) -> String {
        format!(
            "{}/releases/download/{}/{}.zip",
            self.github_url.trim_end_matches('/'),
            tag,
            self.artifact_name
        )
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL: {}", field, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid(format!(
            "{} must use http or https, got {}",
            field, scheme
        ))),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Returns the path to the data directory for prerelease-watch.
/// Uses $XDG_DATA_HOME/prerelease-watch if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/prerelease-watch,
/// or ./prerelease-watch if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the cache database file.
pub fn db_path() -> PathBuf {
    data_dir().join("cache.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("prerelease-watch.log")
}

/// Returns the path of the config file read when none is given.
pub fn default_config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("prerelease-watch")
}
