//! News-Archiver: a versioning news crawler
//!
//! This crate periodically fetches a news site's listing page, follows every
//! teaser link to its article, extracts the article's text, and keeps a
//! versioned history of each article that only grows when the text changes.

pub mod config;
pub mod control;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for News-Archiver operations
#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{operation} did not finish within {seconds}s")]
    CrawlTimeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("URL is not part of the crawled site: {url}")]
    ForeignUrl { url: String },

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure to retrieve a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request was sent to
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::HttpStatus { url, .. } | Self::Network { url, .. } => url,
        }
    }
}

/// Hard extraction failures
///
/// Missing page elements are not errors; they degrade the extracted record
/// and are reported as [`crawler::ExtractionWarning`]s instead.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document for {url} is empty")]
    EmptyDocument { url: String },
}

/// Rejected schedule changes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Schedule interval must be at least 1 hour, got {0}")]
    IntervalTooSmall(i64),

    #[error("Schedule interval of {0} hours is too large")]
    IntervalTooLarge(i64),
}

/// Result type alias for News-Archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use control::Controller;
pub use crawler::{CrawlReport, Orchestrator, Scheduler};
pub use state::{SchedulerState, VersionOutcome};
