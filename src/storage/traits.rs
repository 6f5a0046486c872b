//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::ArticleExtract;
use crate::state::VersionOutcome;
use crate::storage::{
    ArticlePage, ArticleRecord, ArticleVersionRecord, CrawlConfig, IntervalStep, ScheduleUpdate,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Crawl configuration row is missing")]
    ConfigMissing,

    #[error("Invalid timestamp in database: {0}")]
    InvalidTimestamp(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every mutating method runs as one transaction: either all of its writes
/// become visible or none do.
pub trait Storage {
    // ===== Version Store =====

    /// Stores a freshly extracted article and reports what happened
    ///
    /// | Stored state | Condition | Writes | Outcome |
    /// |--------------|-----------|--------|---------|
    /// | no row for URL | - | insert article | `Created` |
    /// | row exists | headline, sub-headline, content identical | last-crawled only | `Unchanged` |
    /// | row exists | any of the three differs | archive old text as a version, overwrite, advance last-crawled | `Changed` |
    ///
    /// Comparison is exact string equality. The read and the writes are one
    /// write-locked transaction, so two crawls of the same URL cannot both
    /// observe "no article" and both insert.
    fn store_article(
        &mut self,
        article: &ArticleExtract,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<VersionOutcome>;

    // ===== Crawl Configuration =====

    /// Creates the configuration row if it does not exist yet and returns it
    fn ensure_crawl_config(
        &mut self,
        interval_hours: i64,
        enabled: bool,
    ) -> StorageResult<CrawlConfig>;

    /// Reads the configuration row
    fn get_crawl_config(&self) -> StorageResult<CrawlConfig>;

    /// Applies an already validated update
    ///
    /// When `reschedule_from` is set and the resulting configuration is
    /// enabled, next-run is recomputed from the new interval in the same
    /// transaction.
    fn update_crawl_config(
        &mut self,
        update: &ScheduleUpdate,
        reschedule_from: Option<DateTime<Utc>>,
    ) -> StorageResult<CrawlConfig>;

    /// Moves the interval one hour up or down, rescheduling like
    /// [`Storage::update_crawl_config`]
    fn step_interval(
        &mut self,
        step: IntervalStep,
        reschedule_from: Option<DateTime<Utc>>,
    ) -> StorageResult<CrawlConfig>;

    /// Sets next-run to `now` plus the interval stored at the time of the write
    ///
    /// Does nothing and returns the row unchanged when the configuration is
    /// disabled.
    fn schedule_next_run(&mut self, now: DateTime<Utc>) -> StorageResult<CrawlConfig>;

    /// Records the completion time of a listing crawl
    fn record_crawl_completed(&mut self, at: DateTime<Utc>) -> StorageResult<()>;

    /// Marks a scheduler loop as alive at `at`, or clears the mark with `None`
    fn record_scheduler_heartbeat(&mut self, at: Option<DateTime<Utc>>) -> StorageResult<()>;

    /// Last heartbeat written by a scheduler loop in any process
    fn scheduler_heartbeat(&self) -> StorageResult<Option<DateTime<Utc>>>;

    // ===== Articles =====

    /// Gets an article by ID
    fn get_article(&self, id: i64) -> StorageResult<Option<ArticleRecord>>;

    /// Gets an article by URL
    fn get_article_by_url(&self, url: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Lists articles, most recently crawled first, with their own version counts
    ///
    /// `page` starts at 1; `per_page` is clamped to [`crate::storage::MAX_PER_PAGE`].
    fn list_articles(&self, page: u32, per_page: u32) -> StorageResult<ArticlePage>;

    /// Gets the archived versions of an article, newest first
    fn get_versions(&self, article_id: i64) -> StorageResult<Vec<ArticleVersionRecord>>;

    /// Counts the versions belonging to one article
    fn count_versions(&self, article_id: i64) -> StorageResult<u64>;

    /// Returns true if at least one version was archived for the article
    fn has_changed(&self, article_id: i64) -> StorageResult<bool> {
        Ok(self.count_versions(article_id)? > 0)
    }

    // ===== Statistics =====

    /// Gets total article count
    fn count_articles(&self) -> StorageResult<u64>;

    /// Gets total version count across all articles
    fn count_all_versions(&self) -> StorageResult<u64>;

    /// Counts articles with at least one archived version
    fn count_changed_articles(&self) -> StorageResult<u64>;
}
