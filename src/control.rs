//! Control surface for the archiver
//!
//! [`Controller`] wires storage, orchestrator and scheduler together from a
//! [`Config`] and exposes the operations an outer layer (the CLI, or an HTTP
//! front-end) invokes: schedule changes and on-demand crawls, each bounded
//! by its configured timeout.

use crate::config::Config;
use crate::crawler::{CrawlReport, Orchestrator, Scheduler};
use crate::state::SchedulerState;
use crate::storage::{
    open_storage, share, CrawlConfig, IntervalStep, ScheduleUpdate, SharedStorage, SqliteStorage,
    Storage,
};
use crate::url::classify_url;
use crate::{ArchiverError, Result};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Owns the crawl pipeline of one archiver process
pub struct Controller {
    settings: Config,
    storage: SharedStorage,
    orchestrator: Orchestrator,
    scheduler: Scheduler,
}

impl Controller {
    /// Opens the configured database and builds the pipeline
    ///
    /// The crawl configuration row is seeded from `[scheduler]` only if the
    /// database does not have one yet.
    pub fn from_config(settings: Config) -> Result<Self> {
        let storage = open_storage(Path::new(&settings.storage.database_path))?;
        Self::with_storage(settings, storage)
    }

    /// Builds the pipeline on top of an already opened storage backend
    pub fn with_storage(settings: Config, mut storage: SqliteStorage) -> Result<Self> {
        let crawl_config = storage.ensure_crawl_config(
            settings.scheduler.default_interval_hours,
            settings.scheduler.enabled_on_start,
        )?;
        tracing::info!(
            enabled = crawl_config.enabled,
            interval_hours = crawl_config.interval_hours,
            "Loaded crawl configuration"
        );

        let storage = share(storage);
        let orchestrator = Orchestrator::from_config(&settings, storage.clone())?;
        let scheduler = Scheduler::new(orchestrator.clone(), settings.scheduler.poll_interval());

        Ok(Self {
            settings,
            storage,
            orchestrator,
            scheduler,
        })
    }

    /// The file configuration this controller was built from
    pub fn settings(&self) -> &Config {
        &self.settings
    }

    /// Storage handle for read-side queries
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Starts the background scheduler
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// Stops the background scheduler and waits for its loop to exit
    pub async fn stop(&mut self) -> Result<()> {
        self.scheduler.stop().await
    }

    // ===== Schedule =====

    /// Changes interval and/or enabled flag
    ///
    /// # Errors
    ///
    /// `ArchiverError::Validation` if the interval is below one hour; nothing
    /// is written in that case.
    pub fn reconfigure(&self, update: ScheduleUpdate) -> Result<CrawlConfig> {
        self.scheduler.reconfigure(&update)
    }

    pub fn set_interval(&self, hours: i64) -> Result<CrawlConfig> {
        self.reconfigure(ScheduleUpdate::interval(hours))
    }

    pub fn enable(&self) -> Result<CrawlConfig> {
        self.reconfigure(ScheduleUpdate::enabled(true))
    }

    pub fn disable(&self) -> Result<CrawlConfig> {
        self.reconfigure(ScheduleUpdate::enabled(false))
    }

    /// Lengthens or shortens the interval by one hour; shortening stops at one hour
    pub fn step_interval(&self, step: IntervalStep) -> Result<CrawlConfig> {
        self.scheduler.step_interval(step)
    }

    /// Current crawl configuration
    pub fn config(&self) -> Result<CrawlConfig> {
        self.scheduler.config()
    }

    // ===== On-demand crawls =====

    /// Crawls the listing page now, bounded by `listing-crawl-timeout-secs`
    ///
    /// On timeout the crawl is abandoned; articles stored before that point
    /// stay stored but the crawl is not recorded as completed.
    pub async fn trigger_listing_crawl(&self) -> Result<CrawlReport> {
        with_timeout(
            "listing crawl",
            self.settings.fetch.listing_crawl_timeout(),
            self.orchestrator.crawl_listing(),
        )
        .await
    }

    /// Crawls one article now, bounded by `control-timeout-secs`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The article was new or had changed
    /// * `Ok(false)` - The article was unchanged
    ///
    /// # Errors
    ///
    /// `ArchiverError::ForeignUrl` if `url` is not on the archived site.
    pub async fn trigger_article_crawl(&self, url: &str) -> Result<bool> {
        let mut parsed = Url::parse(url)?;
        parsed.set_fragment(None);

        if !classify_url(&parsed, self.orchestrator.listing_url()).should_crawl() {
            return Err(ArchiverError::ForeignUrl {
                url: url.to_string(),
            });
        }

        with_timeout(
            "article crawl",
            self.settings.fetch.control_timeout(),
            self.orchestrator.crawl_one(parsed.as_str()),
        )
        .await
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("{} did not finish within {:?}", operation, limit);
            Err(ArchiverError::CrawlTimeout {
                operation,
                seconds: limit.as_secs(),
            })
        }
    }
}
