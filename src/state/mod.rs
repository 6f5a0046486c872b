//! State module for the crawl pipeline
//!
//! # Components
//!
//! - `VersionOutcome`: the three-way result of storing an extracted article
//! - `SchedulerState`: whether the background scheduler loop is alive

mod scheduler_state;
mod version_outcome;

// Re-export main types
pub use scheduler_state::SchedulerState;
pub use version_outcome::VersionOutcome;
