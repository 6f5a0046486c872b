use serde::Deserialize;
use std::time::Duration;

/// Desktop browser identification; the listing site rejects unidentified agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Main configuration structure for News-Archiver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
}

/// The news site being archived
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Front page whose teaser links point at current articles
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Request timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Timeout for a single page request (seconds)
    #[serde(rename = "article-timeout-secs", default = "default_article_timeout")]
    pub article_timeout_secs: u64,

    /// Upper bound for an externally triggered listing crawl (seconds)
    #[serde(
        rename = "listing-crawl-timeout-secs",
        default = "default_listing_crawl_timeout"
    )]
    pub listing_crawl_timeout_secs: u64,

    /// Upper bound for short control calls such as a single-article crawl (seconds)
    #[serde(rename = "control-timeout-secs", default = "default_control_timeout")]
    pub control_timeout_secs: u64,
}

/// Background scheduler behavior
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// How often the loop re-reads the crawl configuration (seconds)
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Interval written to a fresh database (hours)
    #[serde(
        rename = "default-interval-hours",
        default = "default_interval_hours"
    )]
    pub default_interval_hours: i64,

    /// Enabled flag written to a fresh database
    #[serde(rename = "enabled-on-start", default = "default_enabled")]
    pub enabled_on_start: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            article_timeout_secs: default_article_timeout(),
            listing_crawl_timeout_secs: default_listing_crawl_timeout(),
            control_timeout_secs: default_control_timeout(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            default_interval_hours: default_interval_hours(),
            enabled_on_start: default_enabled(),
        }
    }
}

impl FetchConfig {
    pub fn article_timeout(&self) -> Duration {
        Duration::from_secs(self.article_timeout_secs)
    }

    pub fn listing_crawl_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_crawl_timeout_secs)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_secs)
    }
}

impl SchedulerConfig {
    /// The polling quantum: staleness bound for schedule changes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_article_timeout() -> u64 {
    10
}

fn default_listing_crawl_timeout() -> u64 {
    300
}

fn default_control_timeout() -> u64 {
    5
}

// 20 minutes
fn default_poll_interval() -> u64 {
    1200
}

fn default_interval_hours() -> i64 {
    1
}

fn default_enabled() -> bool {
    true
}
