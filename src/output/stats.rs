//! Statistics generation from the archive database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::storage::{CrawlConfig, Storage};
use crate::Result;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct ArchiveStatistics {
    /// Number of distinct article URLs ever stored
    pub total_articles: u64,

    /// Number of archived versions across all articles
    pub total_versions: u64,

    /// Number of articles with at least one archived version
    pub changed_articles: u64,

    /// The crawl configuration at the time the statistics were taken
    pub crawl_config: CrawlConfig,
}

impl ArchiveStatistics {
    /// Percentage of articles that changed at least once after first being stored
    pub fn change_rate(&self) -> f64 {
        if self.total_articles == 0 {
            return 0.0;
        }
        (self.changed_articles as f64 / self.total_articles as f64) * 100.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully loaded statistics
/// * `Err(ArchiverError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<ArchiveStatistics> {
    Ok(ArchiveStatistics {
        total_articles: storage.count_articles()?,
        total_versions: storage.count_all_versions()?,
        changed_articles: storage.count_changed_articles()?,
        crawl_config: storage.get_crawl_config()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Articles: {}", stats.total_articles);
    println!("  Archived versions: {}", stats.total_versions);
    println!(
        "  Articles changed at least once: {} ({:.1}%)",
        stats.changed_articles,
        stats.change_rate()
    );
    println!();

    let config = &stats.crawl_config;
    println!("Schedule:");
    println!(
        "  Status: {}",
        if config.enabled { "enabled" } else { "disabled" }
    );
    println!("  Interval: {} hour(s)", config.interval_hours);
    match config.last_run {
        Some(last_run) => println!("  Last crawl: {}", last_run),
        None => println!("  Last crawl: never"),
    }
    match config.next_run {
        Some(next_run) => println!("  Next crawl: {}", next_run),
        None if config.enabled => println!("  Next crawl: due now"),
        None => println!("  Next crawl: -"),
    }
}
