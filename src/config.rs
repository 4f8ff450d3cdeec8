use crate::drivers::RetryPolicy;
use crate::engines::Engine;
use crate::error::ConfigError;
use crate::filter::LinkFilterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the WebDriver endpoint
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";

/// Configuration for a scavenging run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScavengerConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Page load timeout applied to the browser session
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,

    /// How long to wait for a verification challenge to clear before giving up on a page
    #[serde(default = "default_challenge_timeout_secs")]
    pub challenge_timeout_secs: u64,

    /// Interval between checks while waiting on a challenge
    #[serde(default = "default_challenge_poll_ms")]
    pub challenge_poll_ms: u64,

    /// Results pages to request from each engine
    #[serde(default = "default_pages_per_engine")]
    pub pages_per_engine: usize,

    /// Engines to query, in order
    #[serde(default = "default_engines")]
    pub engines: Vec<Engine>,

    /// Retry behavior for a failing results page
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Random pause between two pages of the same engine
    #[serde(default = "default_page_delay_min_ms")]
    pub page_delay_min_ms: u64,
    #[serde(default = "default_page_delay_max_ms")]
    pub page_delay_max_ms: u64,

    /// Random pause before switching to the next engine
    #[serde(default = "default_engine_delay_min_ms")]
    pub engine_delay_min_ms: u64,
    #[serde(default = "default_engine_delay_max_ms")]
    pub engine_delay_max_ms: u64,

    /// Directory the results file is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Link validation rules
    #[serde(default)]
    pub filter: LinkFilterConfig,
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_page_load_timeout_secs() -> u64 {
    10
}

fn default_challenge_timeout_secs() -> u64 {
    30
}

fn default_challenge_poll_ms() -> u64 {
    1000
}

/// Default number of pages per engine
pub fn default_pages_per_engine() -> usize {
    3
}

fn default_engines() -> Vec<Engine> {
    Engine::DEFAULT_ORDER.to_vec()
}

fn default_page_delay_min_ms() -> u64 {
    1000
}

fn default_page_delay_max_ms() -> u64 {
    2000
}

fn default_engine_delay_min_ms() -> u64 {
    2000
}

fn default_engine_delay_max_ms() -> u64 {
    4000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ScavengerConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
            challenge_timeout_secs: default_challenge_timeout_secs(),
            challenge_poll_ms: default_challenge_poll_ms(),
            pages_per_engine: default_pages_per_engine(),
            engines: default_engines(),
            retry: RetryPolicy::default(),
            page_delay_min_ms: default_page_delay_min_ms(),
            page_delay_max_ms: default_page_delay_max_ms(),
            engine_delay_min_ms: default_engine_delay_min_ms(),
            engine_delay_max_ms: default_engine_delay_max_ms(),
            output_dir: default_output_dir(),
            filter: LinkFilterConfig::default(),
        }
    }
}

impl ScavengerConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the WebDriver URL with `WEBDRIVER_URL` if it is set and non-empty
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var(WEBDRIVER_URL_ENV) {
            if !webdriver_url.is_empty() {
                ::log::debug!("Using WebDriver URL from environment: {}", webdriver_url);
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ScavengerConfig::default();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.pages_per_engine, 3);
        assert_eq!(config.engines, vec![Engine::Google, Engine::Bing]);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.headless);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ScavengerConfig::from_json(
            r#"{"pages_per_engine": 5, "engines": ["bing"], "retry": {"max_attempts": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.pages_per_engine, 5);
        assert_eq!(config.engines, vec![Engine::Bing]);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.page_delay_max_ms, 2000);
        assert_eq!(config.filter.hosting_domains.len(), 14);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"webdriver_url": "http://localhost:9515", "headless": false}}"#).unwrap();

        let config = ScavengerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert!(!config.headless);
    }

    #[test]
    fn test_bad_input_is_reported() {
        assert!(matches!(
            ScavengerConfig::from_json(r#"{"engines": ["altavista"]}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ScavengerConfig::from_file("/nonexistent/scavenger.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
