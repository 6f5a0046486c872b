//! Crawl orchestration
//!
//! Composes the fetcher, the extractor and the version store into the two
//! crawl operations: a full listing crawl that fans out to every teaser link,
//! and a crawl of one article URL.

use crate::config::Config;
use crate::crawler::extractor::{extract_article, extract_links};
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::state::VersionOutcome;
use crate::storage::{lock_storage, SharedStorage, Storage};
use crate::Result;
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// Aggregated outcome of one listing crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Distinct article URLs found on the listing page
    pub links_found: usize,
    pub created: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Articles whose fetch, extraction or store failed
    pub failed: usize,
}

impl CrawlReport {
    /// Number of articles that produced a new version (created or changed)
    pub fn new_versions(&self) -> usize {
        self.created + self.changed
    }

    /// Counts one stored article
    pub fn record(&mut self, outcome: VersionOutcome) {
        match outcome {
            VersionOutcome::Created => self.created += 1,
            VersionOutcome::Changed => self.changed += 1,
            VersionOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Runs listing and single-article crawls against shared storage
///
/// Cloning is cheap; clones share the HTTP client and the storage handle.
#[derive(Clone)]
pub struct Orchestrator {
    client: Client,
    storage: SharedStorage,
    listing_url: Url,
    article_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        client: Client,
        storage: SharedStorage,
        listing_url: Url,
        article_timeout: Duration,
    ) -> Self {
        Self {
            client,
            storage,
            listing_url,
            article_timeout,
        }
    }

    /// Creates an orchestrator from a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The archiver configuration
    /// * `storage` - Storage shared with the scheduler and control calls
    pub fn from_config(config: &Config, storage: SharedStorage) -> Result<Self> {
        let client = build_http_client(&config.site)?;
        let listing_url = Url::parse(&config.site.listing_url)?;

        Ok(Self::new(
            client,
            storage,
            listing_url,
            config.fetch.article_timeout(),
        ))
    }

    /// The listing page this orchestrator crawls
    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Crawls the listing page and every article it links to
    ///
    /// Articles are processed sequentially. A failing article is logged and
    /// counted in [`CrawlReport::failed`]; the others still run. The
    /// crawl-completed time is recorded once all links were processed.
    ///
    /// # Errors
    ///
    /// Fails without recording a completed crawl if the listing page cannot
    /// be fetched. Also fails if the completion time cannot be stored.
    pub async fn crawl_listing(&self) -> Result<CrawlReport> {
        let started = Instant::now();
        tracing::info!("Starting listing crawl of {}", self.listing_url);

        let html = match fetch_page(&self.client, self.listing_url.as_str(), self.article_timeout)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Listing page fetch failed: {}", e);
                return Err(e.into());
            }
        };

        let links = extract_links(&html, &self.listing_url);
        tracing::info!("Found {} article links", links.len());

        let mut report = CrawlReport {
            links_found: links.len(),
            ..CrawlReport::default()
        };

        for url in &links {
            match self.crawl_article(url).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    tracing::error!(url = %url, "Article crawl failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        {
            let mut storage = lock_storage(&self.storage)?;
            storage.record_crawl_completed(Utc::now())?;
        }

        tracing::info!(
            created = report.created,
            changed = report.changed,
            unchanged = report.unchanged,
            failed = report.failed,
            "Listing crawl finished in {:?}: {} new versions",
            started.elapsed(),
            report.new_versions()
        );

        Ok(report)
    }

    /// Fetches, extracts and stores one article
    pub async fn crawl_article(&self, url: &str) -> Result<VersionOutcome> {
        tracing::debug!("Crawling article {}", url);

        let html = fetch_page(&self.client, url, self.article_timeout).await?;
        let extraction = extract_article(&html, url)?;

        for warning in &extraction.warnings {
            tracing::warn!(url = %url, "Degraded extraction: {}", warning);
        }

        let outcome = {
            let mut storage = lock_storage(&self.storage)?;
            storage.store_article(&extraction.article, Utc::now())?
        };

        tracing::debug!(url = %url, outcome = %outcome, "Stored article");
        Ok(outcome)
    }

    /// Crawls one article and reports whether it produced a new version
    ///
    /// Never touches the crawl configuration.
    pub async fn crawl_one(&self, url: &str) -> Result<bool> {
        let outcome = self.crawl_article(url).await?;
        tracing::info!("Crawled {}: {}", url, outcome);
        Ok(outcome.is_new_version())
    }
}
