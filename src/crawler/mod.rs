//! Crawler module for fetching, extracting and versioning articles
//!
//! This module contains the crawl pipeline, including:
//! - HTTP fetching with a fixed user agent and per-request timeouts
//! - HTML extraction of teaser links and article fields
//! - Crawl orchestration over the listing page and single articles
//! - The background scheduler that triggers listing crawls when due

mod extractor;
mod fetcher;
mod orchestrator;
mod scheduler;

pub use extractor::{
    extract_article, extract_links, parse_updated_at, ArticleExtract, Extraction,
    ExtractionWarning, CONTENT_PLACEHOLDER, HEADLINE_PLACEHOLDER, PARAGRAPH_SEPARATOR,
    TEASER_LINK_SELECTOR,
};
pub use fetcher::{build_http_client, fetch_page};
pub use orchestrator::{CrawlReport, Orchestrator};
pub use scheduler::{run_iteration, Scheduler};
