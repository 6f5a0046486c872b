//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::ArticleExtract;
use crate::state::VersionOutcome;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    ArticlePage, ArticleRecord, ArticleSummary, ArticleVersionRecord, CrawlConfig, IntervalStep,
    ScheduleUpdate, MAX_PER_PAGE,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// Storage format of the page-supplied "last updated" time
const UPDATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ARTICLE_COLUMNS: &str =
    "id, url, headline, sub_headline, content, updated_at, first_crawled_at, last_crawled_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Writers from other processes wait for the lock instead of failing
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("'{}': {}", raw, e)))
}

fn parse_optional_timestamp(raw: Option<String>) -> StorageResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

/// Article columns as stored, before timestamp parsing
struct ArticleRow {
    id: i64,
    url: String,
    headline: String,
    sub_headline: String,
    content: String,
    updated_at: Option<String>,
    first_crawled_at: String,
    last_crawled_at: String,
}

impl ArticleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            headline: row.get(2)?,
            sub_headline: row.get(3)?,
            content: row.get(4)?,
            updated_at: row.get(5)?,
            first_crawled_at: row.get(6)?,
            last_crawled_at: row.get(7)?,
        })
    }

    fn into_record(self) -> StorageResult<ArticleRecord> {
        let updated_at = match self.updated_at {
            Some(raw) => Some(
                NaiveDateTime::parse_from_str(&raw, UPDATED_AT_FORMAT)
                    .map_err(|e| StorageError::InvalidTimestamp(format!("'{}': {}", raw, e)))?,
            ),
            None => None,
        };

        Ok(ArticleRecord {
            id: self.id,
            url: self.url,
            headline: self.headline,
            sub_headline: self.sub_headline,
            content: self.content,
            updated_at,
            first_crawled_at: parse_timestamp(&self.first_crawled_at)?,
            last_crawled_at: parse_timestamp(&self.last_crawled_at)?,
        })
    }
}

/// Reads the singleton configuration row through any connection or transaction
fn read_crawl_config(conn: &Connection) -> StorageResult<CrawlConfig> {
    let row = conn
        .query_row(
            "SELECT enabled, interval_hours, last_run, next_run FROM crawl_config WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    let (enabled, interval_hours, last_run, next_run) = row.ok_or(StorageError::ConfigMissing)?;

    Ok(CrawlConfig {
        enabled,
        interval_hours,
        last_run: parse_optional_timestamp(last_run)?,
        next_run: parse_optional_timestamp(next_run)?,
    })
}

/// Recomputes next-run from the interval in `config` if it is enabled
fn reschedule(
    conn: &Connection,
    config: &mut CrawlConfig,
    from: Option<DateTime<Utc>>,
) -> StorageResult<()> {
    let Some(from) = from else {
        return Ok(());
    };
    if !config.enabled {
        return Ok(());
    }

    // Stored precision, so the returned row matches a later read
    let next_run = config.next_run_after(from).trunc_subsecs(6);
    conn.execute(
        "UPDATE crawl_config SET next_run = ?1 WHERE id = 1",
        params![format_timestamp(next_run)],
    )?;
    config.next_run = Some(next_run);
    Ok(())
}

impl Storage for SqliteStorage {
    // ===== Version Store =====

    fn store_article(
        &mut self,
        article: &ArticleExtract,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<VersionOutcome> {
        let now = format_timestamp(crawled_at);
        let updated_at = article
            .updated_at
            .map(|t| t.format(UPDATED_AT_FORMAT).to_string());

        // IMMEDIATE takes the write lock before the read below
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(i64, String, String, String)> = tx
            .query_row(
                "SELECT id, headline, sub_headline, content FROM articles WHERE url = ?1",
                params![article.url],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO articles
                     (url, headline, sub_headline, content, updated_at, first_crawled_at, last_crawled_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![
                        article.url,
                        article.headline,
                        article.sub_headline,
                        article.content,
                        updated_at,
                        now
                    ],
                )?;
                VersionOutcome::Created
            }

            Some((id, headline, sub_headline, content))
                if headline == article.headline
                    && sub_headline == article.sub_headline
                    && content == article.content =>
            {
                tx.execute(
                    "UPDATE articles SET last_crawled_at = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
                VersionOutcome::Unchanged
            }

            Some((id, ..)) => {
                // The archived text is tagged with the crawl time at which it was current
                tx.execute(
                    "INSERT INTO article_versions (article_id, headline, sub_headline, content, crawled_at)
                     SELECT id, headline, sub_headline, content, last_crawled_at
                     FROM articles WHERE id = ?1",
                    params![id],
                )?;
                tx.execute(
                    "UPDATE articles SET headline = ?1, sub_headline = ?2, content = ?3,
                     updated_at = ?4, last_crawled_at = ?5 WHERE id = ?6",
                    params![
                        article.headline,
                        article.sub_headline,
                        article.content,
                        updated_at,
                        now,
                        id
                    ],
                )?;
                VersionOutcome::Changed
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    // ===== Crawl Configuration =====

    fn ensure_crawl_config(
        &mut self,
        interval_hours: i64,
        enabled: bool,
    ) -> StorageResult<CrawlConfig> {
        self.conn.execute(
            "INSERT OR IGNORE INTO crawl_config (id, enabled, interval_hours) VALUES (1, ?1, ?2)",
            params![enabled, interval_hours],
        )?;
        read_crawl_config(&self.conn)
    }

    fn get_crawl_config(&self) -> StorageResult<CrawlConfig> {
        read_crawl_config(&self.conn)
    }

    fn update_crawl_config(
        &mut self,
        update: &ScheduleUpdate,
        reschedule_from: Option<DateTime<Utc>>,
    ) -> StorageResult<CrawlConfig> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(hours) = update.interval_hours {
            tx.execute(
                "UPDATE crawl_config SET interval_hours = ?1 WHERE id = 1",
                params![hours],
            )?;
        }
        if let Some(enabled) = update.enabled {
            tx.execute(
                "UPDATE crawl_config SET enabled = ?1 WHERE id = 1",
                params![enabled],
            )?;
        }

        let mut config = read_crawl_config(&tx)?;
        reschedule(&tx, &mut config, reschedule_from)?;

        tx.commit()?;
        Ok(config)
    }

    fn step_interval(
        &mut self,
        step: IntervalStep,
        reschedule_from: Option<DateTime<Utc>>,
    ) -> StorageResult<CrawlConfig> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut config = read_crawl_config(&tx)?;
        config.interval_hours = step.apply(config.interval_hours);
        tx.execute(
            "UPDATE crawl_config SET interval_hours = ?1 WHERE id = 1",
            params![config.interval_hours],
        )?;
        reschedule(&tx, &mut config, reschedule_from)?;

        tx.commit()?;
        Ok(config)
    }

    fn schedule_next_run(&mut self, now: DateTime<Utc>) -> StorageResult<CrawlConfig> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut config = read_crawl_config(&tx)?;
        reschedule(&tx, &mut config, Some(now))?;

        tx.commit()?;
        Ok(config)
    }

    fn record_crawl_completed(&mut self, at: DateTime<Utc>) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_config SET last_run = ?1 WHERE id = 1",
            params![format_timestamp(at)],
        )?;
        if updated == 0 {
            return Err(StorageError::ConfigMissing);
        }
        Ok(())
    }

    fn record_scheduler_heartbeat(&mut self, at: Option<DateTime<Utc>>) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_config SET scheduler_heartbeat = ?1 WHERE id = 1",
            params![at.map(format_timestamp)],
        )?;
        if updated == 0 {
            return Err(StorageError::ConfigMissing);
        }
        Ok(())
    }

    fn scheduler_heartbeat(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let raw: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT scheduler_heartbeat FROM crawl_config WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        parse_optional_timestamp(raw.ok_or(StorageError::ConfigMissing)?)
    }

    // ===== Articles =====

    fn get_article(&self, id: i64) -> StorageResult<Option<ArticleRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS),
                params![id],
                ArticleRow::from_row,
            )
            .optional()?;

        row.map(ArticleRow::into_record).transpose()
    }

    fn get_article_by_url(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE url = ?1", ARTICLE_COLUMNS),
                params![url],
                ArticleRow::from_row,
            )
            .optional()?;

        row.map(ArticleRow::into_record).transpose()
    }

    fn list_articles(&self, page: u32, per_page: u32) -> StorageResult<ArticlePage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let offset = (page as i64 - 1) * per_page as i64;

        let total = self.count_articles()?;

        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.url, a.headline, a.sub_headline, a.content, a.updated_at,
                    a.first_crawled_at, a.last_crawled_at,
                    (SELECT COUNT(*) FROM article_versions v WHERE v.article_id = a.id)
             FROM articles a
             ORDER BY a.last_crawled_at DESC, a.id DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt
            .query_map(params![per_page, offset], |row| {
                Ok((ArticleRow::from_row(row)?, row.get::<_, i64>(8)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut articles = Vec::with_capacity(rows.len());
        for (row, version_count) in rows {
            articles.push(ArticleSummary {
                article: row.into_record()?,
                version_count: version_count as u64,
            });
        }

        Ok(ArticlePage {
            total,
            page,
            per_page,
            articles,
        })
    }

    fn get_versions(&self, article_id: i64) -> StorageResult<Vec<ArticleVersionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, article_id, headline, sub_headline, content, crawled_at
             FROM article_versions WHERE article_id = ?1
             ORDER BY crawled_at DESC, id DESC",
        )?;

        let rows = stmt
            .query_map(params![article_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, article_id, headline, sub_headline, content, crawled_at)| {
                    Ok(ArticleVersionRecord {
                        id,
                        article_id,
                        headline,
                        sub_headline,
                        content,
                        crawled_at: parse_timestamp(&crawled_at)?,
                    })
                },
            )
            .collect()
    }

    fn count_versions(&self, article_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM article_versions WHERE article_id = ?1",
            params![article_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Statistics =====

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_all_versions(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM article_versions", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn count_changed_articles(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT article_id) FROM article_versions",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
