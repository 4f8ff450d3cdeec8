//! Error types shared across the crate.
//!
//! Only [`ScavengerError`] ends a session. Driver errors are absorbed per
//! page by the retry loop, and persistence errors are handed back to the
//! caller with the in-memory results left intact.

use std::path::PathBuf;

/// Session-level failures
#[derive(Debug, thiserror::Error)]
pub enum ScavengerError {
    /// Query, page count or engine list is unusable
    #[error("invalid session options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The browser automation backend could not be reached; nothing was searched
    #[error("search driver could not be initialized: {0}")]
    DriverInit(#[source] DriverError),

    /// The background session task panicked or was cancelled
    #[error("session task failed: {0}")]
    Task(String),
}

/// Failures of a single search driver call
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("could not connect to WebDriver: {0}")]
    Connect(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("could not read page source: {0}")]
    Source(String),

    #[error("could not parse results page: {0}")]
    Parse(String),

    /// A verification challenge did not clear within the wait window
    #[error("blocked by a verification challenge at {0}")]
    Blocked(String),

    /// The WebDriver session died; it has been re-established if possible
    #[error("WebDriver session lost: {0}")]
    SessionLost(String),
}

/// Failures writing or reading a persisted record
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
