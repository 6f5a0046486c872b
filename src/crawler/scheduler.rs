//! Background crawl scheduler
//!
//! The scheduler owns a single tokio task that wakes up every polling
//! quantum, re-reads the crawl configuration from storage and runs a listing
//! crawl whenever one is due.
//!
//! # Lifecycle
//!
//! | State | Operation | Effect |
//! |-------|-----------|--------|
//! | `Stopped` | `start()` | spawn the loop; its first iteration runs immediately |
//! | `Running` | `stop()` | cancel and join; an in-flight crawl finishes first |
//! | either | `reconfigure()` | validate, write, reschedule only while a loop is live |
//!
//! The configuration lives in storage rather than in the task, so a change
//! written by a control call is picked up by the next iteration at the
//! latest.
//!
//! A running loop writes a heartbeat into the configuration row around every
//! iteration and clears it when it stops. A control call made from another
//! process sharing the database sees the heartbeat and reschedules as if the
//! loop were local. A heartbeat older than [`HEARTBEAT_QUANTA`] polling
//! quanta belongs to a loop that is gone.

use crate::crawler::orchestrator::{CrawlReport, Orchestrator};
use crate::state::SchedulerState;
use crate::storage::{
    lock_storage, CrawlConfig, IntervalStep, ScheduleUpdate, Storage, StorageResult,
};
use crate::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Polling quanta after which an unrefreshed heartbeat counts as stale
pub const HEARTBEAT_QUANTA: u32 = 2;

/// Handle to the spawned loop task
struct LoopHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives scheduled listing crawls
pub struct Scheduler {
    orchestrator: Orchestrator,
    poll_interval: Duration,
    running: Option<LoopHandle>,
}

impl Scheduler {
    /// Creates a stopped scheduler
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Runs the crawls; its storage holds the crawl configuration
    /// * `poll_interval` - The polling quantum between configuration checks
    pub fn new(orchestrator: Orchestrator, poll_interval: Duration) -> Self {
        Self {
            orchestrator,
            poll_interval,
            running: None,
        }
    }

    /// State of the loop owned by this scheduler
    ///
    /// A loop task that ended on its own, for example by panicking, counts as
    /// stopped.
    pub fn state(&self) -> SchedulerState {
        let alive = self
            .running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished());
        if alive {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Spawns the background loop
    ///
    /// Starting a running scheduler does nothing. Must be called from within
    /// a tokio runtime.
    pub fn start(&mut self) {
        if !self.state().can_transition_to(SchedulerState::Running) {
            tracing::warn!("Scheduler is already running");
            return;
        }
        if self.running.take().is_some() {
            tracing::warn!("Previous scheduler loop ended unexpectedly, restarting");
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.orchestrator.clone(),
            self.poll_interval,
            cancel.clone(),
        ));

        self.running = Some(LoopHandle { cancel, handle });
        tracing::info!(
            "Scheduler started, polling every {:?}",
            self.poll_interval
        );
    }

    /// Signals the loop to exit and waits for it
    ///
    /// A sleeping loop wakes up at once. A crawl in progress is not
    /// interrupted; this call returns after it completes.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            tracing::debug!("Scheduler is not running");
            return Ok(());
        };

        running.cancel.cancel();
        running.handle.await?;

        tracing::info!("Scheduler stopped");
        Ok(())
    }

    /// Returns true if this scheduler or one in another process is looping
    fn loop_is_live(&self, storage: &dyn Storage, now: DateTime<Utc>) -> StorageResult<bool> {
        if self.state().is_running() {
            return Ok(true);
        }
        Ok(storage
            .scheduler_heartbeat()?
            .is_some_and(|beat| heartbeat_is_fresh(beat, now, self.poll_interval)))
    }

    /// Validates and applies a configuration change
    ///
    /// While a loop is live and the result is enabled, next-run is
    /// recomputed from the new interval in the same transaction, so a
    /// shorter interval does not wait out the old one. A rejected update
    /// writes nothing.
    pub fn reconfigure(&self, update: &ScheduleUpdate) -> Result<CrawlConfig> {
        update.validate()?;
        if update.is_empty() {
            return self.config();
        }

        let config = {
            let mut storage = lock_storage(self.orchestrator.storage())?;
            let now = Utc::now();
            let reschedule_from = self.loop_is_live(&*storage, now)?.then_some(now);
            storage.update_crawl_config(update, reschedule_from)?
        };

        tracing::info!(
            enabled = config.enabled,
            interval_hours = config.interval_hours,
            "Schedule updated"
        );
        Ok(config)
    }

    /// Moves the interval one hour up or down, rescheduling like [`Scheduler::reconfigure`]
    pub fn step_interval(&self, step: IntervalStep) -> Result<CrawlConfig> {
        let config = {
            let mut storage = lock_storage(self.orchestrator.storage())?;
            let now = Utc::now();
            let reschedule_from = self.loop_is_live(&*storage, now)?.then_some(now);
            storage.step_interval(step, reschedule_from)?
        };

        tracing::info!(interval_hours = config.interval_hours, "Schedule interval stepped");
        Ok(config)
    }

    /// Current crawl configuration
    pub fn config(&self) -> Result<CrawlConfig> {
        let storage = lock_storage(self.orchestrator.storage())?;
        Ok(storage.get_crawl_config()?)
    }
}

/// Returns true if a heartbeat written at `beat` still marks a live loop
///
/// A heartbeat from the future, as seen with skewed clocks, counts as fresh.
pub fn heartbeat_is_fresh(
    beat: DateTime<Utc>,
    now: DateTime<Utc>,
    poll_interval: Duration,
) -> bool {
    match (now - beat).to_std() {
        Ok(age) => age <= poll_interval * HEARTBEAT_QUANTA,
        Err(_) => true,
    }
}

/// Runs one scheduler iteration
///
/// Reads the configuration; if a crawl is due, crawls the listing and then
/// sets next-run from the interval stored at that moment. Next-run is
/// advanced even when the listing crawl fails, so a broken listing page is
/// retried on the regular schedule.
///
/// # Returns
///
/// * `Ok(None)` - Disabled or not yet due
/// * `Ok(Some(report))` - A crawl ran
/// * `Err(ArchiverError)` - Reading the configuration, the crawl or rescheduling failed
pub async fn run_iteration(orchestrator: &Orchestrator) -> Result<Option<CrawlReport>> {
    let config = {
        let storage = lock_storage(orchestrator.storage())?;
        storage.get_crawl_config()?
    };

    if !config.enabled {
        tracing::debug!("Scheduled crawling is disabled");
        return Ok(None);
    }

    if !config.is_due(Utc::now()) {
        tracing::debug!("No crawl due before {:?}", config.next_run);
        return Ok(None);
    }

    tracing::info!("Running scheduled crawl");
    let crawl = orchestrator.crawl_listing().await;

    let rescheduled = {
        let mut storage = lock_storage(orchestrator.storage())?;
        storage.schedule_next_run(Utc::now())?
    };
    if let Some(next_run) = rescheduled.next_run {
        tracing::info!("Next crawl at {}", next_run);
    }

    crawl.map(Some)
}

async fn run_loop(orchestrator: Orchestrator, poll_interval: Duration, cancel: CancellationToken) {
    tracing::info!("Scheduler loop started");

    loop {
        beat(&orchestrator, Some(Utc::now()));
        if let Err(e) = run_iteration(&orchestrator).await {
            tracing::error!("Scheduler iteration failed: {}", e);
        }
        beat(&orchestrator, Some(Utc::now()));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    beat(&orchestrator, None);
    tracing::info!("Scheduler loop stopped");
}

/// Writes or clears the heartbeat, logging a failed write
fn beat(orchestrator: &Orchestrator, at: Option<DateTime<Utc>>) {
    let result = lock_storage(orchestrator.storage())
        .and_then(|mut storage| storage.record_scheduler_heartbeat(at));
    if let Err(e) = result {
        tracing::warn!("Failed to write scheduler heartbeat: {}", e);
    }
}
