//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the News-Archiver database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Current state of every article ever seen
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    headline TEXT NOT NULL,
    sub_headline TEXT NOT NULL,
    content TEXT NOT NULL,
    updated_at TEXT,
    first_crawled_at TEXT NOT NULL,
    last_crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_last_crawled ON articles(last_crawled_at);

-- Superseded article text, append-only
CREATE TABLE IF NOT EXISTS article_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    headline TEXT NOT NULL,
    sub_headline TEXT NOT NULL,
    content TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_article_versions_article
    ON article_versions(article_id, crawled_at);

CREATE TRIGGER IF NOT EXISTS article_versions_append_only
BEFORE UPDATE ON article_versions
BEGIN
    SELECT RAISE(ABORT, 'article versions are immutable');
END;

-- Singleton scheduler configuration
CREATE TABLE IF NOT EXISTS crawl_config (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    enabled INTEGER NOT NULL DEFAULT 1,
    interval_hours INTEGER NOT NULL DEFAULT 1 CHECK (interval_hours >= 1),
    last_run TEXT,
    next_run TEXT,
    -- Written by a live scheduler loop every polling quantum, cleared on stop
    scheduler_heartbeat TEXT
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
