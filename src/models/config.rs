//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::query::{Endpoint, QueryConfiguration, QueryParam};

/// Environment variable that overrides `feed.api_key`.
pub const API_KEY_ENV: &str = "HEADLINES_API_KEY";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote feed query settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Record normalization rules
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Durable store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Periodic ingest trigger
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Replace the API key with the environment override when one is set.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.feed.api_key = key;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.feed.base_url)
            .map_err(|e| AppError::validation(format!("feed.base_url is invalid: {e}")))?;
        if self.feed.page_size == 0 {
            return Err(AppError::validation("feed.page_size must be > 0"));
        }
        if self.feed.api_key.trim().is_empty() {
            return Err(AppError::validation(format!(
                "feed.api_key is empty (set it in the config or {API_KEY_ENV})"
            )));
        }
        if self.normalize.scheme.trim().is_empty() {
            return Err(AppError::validation("normalize.scheme is empty"));
        }
        if !self
            .normalize
            .scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(AppError::validation(format!(
                "normalize.scheme '{}' is not a valid URL scheme",
                self.normalize.scheme
            )));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(AppError::validation("schedule.interval_secs must be > 0"));
        }
        Ok(())
    }

    /// Build the immutable query for one ingest.
    pub fn query(&self) -> Result<QueryConfiguration> {
        QueryConfiguration::new(
            self.feed.endpoint,
            self.feed.page_size,
            self.feed.api_key.clone(),
            self.feed.params.clone(),
        )
    }
}

/// Remote feed query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL the endpoint path is appended to
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    #[serde(default)]
    pub endpoint: Endpoint,

    /// Number of records requested per fetch
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub api_key: String,

    /// Extra query parameters, sent in order
    #[serde(default = "defaults::params")]
    pub params: Vec<QueryParam>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            endpoint: Endpoint::default(),
            page_size: defaults::page_size(),
            api_key: String::new(),
            params: defaults::params(),
        }
    }
}

/// What to do with a record that cannot be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Drop the record and keep going
    #[default]
    Skip,
    /// Fail the whole ingest without touching the store
    Abort,
}

/// Record normalization rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Transport scheme forced onto every URL field
    #[serde(default = "defaults::scheme")]
    pub scheme: String,

    #[serde(default)]
    pub malformed: MalformedPolicy,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            scheme: defaults::scheme(),
            malformed: MalformedPolicy::default(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Connectivity probe timeout in milliseconds
    #[serde(default = "defaults::probe_timeout")]
    pub probe_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            probe_timeout_ms: defaults::probe_timeout(),
        }
    }
}

/// Durable store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: defaults::storage_path(),
        }
    }
}

/// Periodic ingest trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::query::QueryParam;

    pub fn base_url() -> String {
        "https://newsapi.org/v2".into()
    }
    pub fn page_size() -> u32 {
        20
    }
    pub fn params() -> Vec<QueryParam> {
        vec![QueryParam::new("country", "us")]
    }
    pub fn scheme() -> String {
        "http".into()
    }
    pub fn user_agent() -> String {
        concat!("headlines/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn probe_timeout() -> u64 {
        1500
    }
    pub fn storage_path() -> PathBuf {
        PathBuf::from("storage/articles.json")
    }
    pub fn interval() -> u64 {
        300
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.feed.api_key = "k".to_string();
        config
    }

    #[test]
    fn validate_default_config_with_key_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_api_key() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = valid_config();
        config.feed.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_scheme() {
        let mut config = valid_config();
        config.normalize.scheme = "ht tp".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            endpoint = "everything"
            page_size = 2
            api_key = "k"
            params = [{ name = "q", value = "rust" }]

            [normalize]
            malformed = "abort"
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.endpoint, Endpoint::Everything);
        assert_eq!(config.feed.base_url, "https://newsapi.org/v2");
        assert_eq!(config.normalize.scheme, "http");
        assert_eq!(config.normalize.malformed, MalformedPolicy::Abort);
        assert_eq!(config.schedule.interval_secs, 300);

        let query = config.query().unwrap();
        assert_eq!(query.page_size(), 2);
        assert_eq!(query.params()[0].name, "q");
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.feed.page_size, 20);
    }
}
