//! Output module for reporting on the archive
//!
//! This module handles:
//! - Archive statistics for the `stats` command
//! - Markdown rendering of a single article's change history

pub mod history;
pub mod stats;

pub use history::{format_history_markdown, load_history, ArticleHistory};
pub use stats::{load_statistics, print_statistics, ArchiveStatistics};
