//! Storage module for persisting articles and their history
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The version store: insert, no-op or archive-and-overwrite per crawl
//! - The singleton crawl configuration row shared with the scheduler
//! - Read-side queries over articles and their versions

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::MAX_INTERVAL_HOURS;
use crate::ValidationError;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Largest page size accepted by [`Storage::list_articles`]
pub const MAX_PER_PAGE: u32 = 100;

/// One connection shared by the scheduler loop and control calls
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Wraps a storage backend for sharing between tasks
pub fn share(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks shared storage, reporting a poisoned lock as a storage error
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage
        .lock()
        .map_err(|_| StorageError::Database("storage lock poisoned".to_string()))
}

/// The current state of an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub headline: String,
    pub sub_headline: String,
    pub content: String,
    /// "Last updated" time printed on the page, in the site's local time
    pub updated_at: Option<NaiveDateTime>,
    pub first_crawled_at: DateTime<Utc>,
    pub last_crawled_at: DateTime<Utc>,
}

/// An archived snapshot of an article's text
///
/// `crawled_at` is the last-crawled time at which this text was still
/// current, not the time of the crawl that replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleVersionRecord {
    pub id: i64,
    pub article_id: i64,
    pub headline: String,
    pub sub_headline: String,
    pub content: String,
    pub crawled_at: DateTime<Utc>,
}

/// An article together with the number of versions archived for it
#[derive(Debug, Clone)]
pub struct ArticleSummary {
    pub article: ArticleRecord,
    pub version_count: u64,
}

/// One page of [`ArticleSummary`] rows
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub articles: Vec<ArticleSummary>,
}

impl ArticlePage {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page as u64)
    }
}

/// The process-wide crawl configuration row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub enabled: bool,
    pub interval_hours: i64,
    pub last_run: Option<DateTime<Utc>>,
    /// None means a crawl is due now
    pub next_run: Option<DateTime<Utc>>,
}

impl CrawlConfig {
    /// Returns true if the scheduler should crawl at `now`
    ///
    /// A disabled configuration is never due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.next_run {
            None => true,
            Some(next_run) => now >= next_run,
        }
    }

    /// The next-run time implied by this configuration's interval
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(self.interval_hours)
    }
}

/// Requested change to the crawl configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub interval_hours: Option<i64>,
    pub enabled: Option<bool>,
}

impl ScheduleUpdate {
    pub fn interval(hours: i64) -> Self {
        Self {
            interval_hours: Some(hours),
            enabled: None,
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            interval_hours: None,
            enabled: Some(enabled),
        }
    }

    /// Checks the interval bound; an update without an interval is always valid
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.interval_hours {
            Some(hours) if hours < 1 => Err(ValidationError::IntervalTooSmall(hours)),
            Some(hours) if hours > MAX_INTERVAL_HOURS => {
                Err(ValidationError::IntervalTooLarge(hours))
            }
            _ => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.interval_hours.is_none() && self.enabled.is_none()
    }
}

/// Relative interval change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalStep {
    /// One hour longer
    Increase,
    /// One hour shorter, never below one hour
    Decrease,
}

impl IntervalStep {
    pub fn apply(&self, hours: i64) -> i64 {
        match self {
            Self::Increase => (hours + 1).min(MAX_INTERVAL_HOURS),
            Self::Decrease => (hours - 1).max(1),
        }
    }
}
