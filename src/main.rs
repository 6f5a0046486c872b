//! News-Archiver main entry point
//!
//! This is the command-line interface for the News-Archiver versioning crawler.

use clap::{Parser, Subcommand, ValueEnum};
use news_archiver::config::{load_config_with_hash, Config};
use news_archiver::output::{
    format_history_markdown, load_history, load_statistics, print_statistics,
};
use news_archiver::storage::{lock_storage, CrawlConfig, IntervalStep};
use news_archiver::Controller;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// News-Archiver: a versioning news crawler
///
/// News-Archiver crawls a news site's listing page on a schedule, follows
/// every teaser link and keeps a history of each article that grows only
/// when the article's text changes.
#[derive(Parser, Debug)]
#[command(name = "news-archiver")]
#[command(version = "0.1.0")]
#[command(about = "A versioning news crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print it
    Check,

    #[command(flatten)]
    Archive(ArchiveCommand),
}

/// Commands that open the database
#[derive(Subcommand, Debug)]
enum ArchiveCommand {
    /// Run the scheduler until interrupted with Ctrl-C
    Run,

    /// Crawl the listing page and all linked articles once
    Crawl,

    /// Crawl a single article
    CrawlArticle {
        /// Article URL on the archived site
        url: String,
    },

    /// Set the crawl interval in hours
    Schedule {
        /// Hours between scheduled crawls (at least 1)
        #[arg(allow_hyphen_values = true)]
        hours: i64,
    },

    /// Lengthen or shorten the crawl interval by one hour
    ScheduleStep {
        #[arg(value_enum)]
        direction: StepDirection,
    },

    /// Enable scheduled crawling
    Enable,

    /// Disable scheduled crawling
    Disable,

    /// Show statistics from the database
    Stats,

    /// Print an article and all of its archived versions
    History {
        /// Article URL as stored
        url: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StepDirection {
    Increase,
    Decrease,
}

impl From<StepDirection> for IntervalStep {
    fn from(direction: StepDirection) -> Self {
        match direction {
            StepDirection::Increase => IntervalStep::Increase,
            StepDirection::Decrease => IntervalStep::Decrease,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let command = match cli.command {
        Command::Check => {
            handle_check(&config);
            return Ok(());
        }
        Command::Archive(command) => command,
    };

    let mut controller = Controller::from_config(config)?;

    match command {
        ArchiveCommand::Run => handle_run(&mut controller).await?,
        ArchiveCommand::Crawl => handle_crawl(&controller).await?,
        ArchiveCommand::CrawlArticle { url } => handle_crawl_article(&controller, &url).await?,
        ArchiveCommand::Schedule { hours } => print_schedule(&controller.set_interval(hours)?),
        ArchiveCommand::ScheduleStep { direction } => {
            print_schedule(&controller.step_interval(direction.into())?)
        }
        ArchiveCommand::Enable => print_schedule(&controller.enable()?),
        ArchiveCommand::Disable => print_schedule(&controller.disable()?),
        ArchiveCommand::Stats => handle_stats(&controller)?,
        ArchiveCommand::History { url } => handle_history(&controller, &url)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_archiver=info,warn"),
            1 => EnvFilter::new("news_archiver=debug,info"),
            2 => EnvFilter::new("news_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `check`: the configuration was already validated while loading
fn handle_check(config: &Config) {
    println!("=== News-Archiver Configuration ===\n");

    println!("Site:");
    println!("  Listing URL: {}", config.site.listing_url);
    println!("  User agent: {}", config.site.user_agent);

    println!("\nFetch:");
    println!("  Article timeout: {}s", config.fetch.article_timeout_secs);
    println!(
        "  Listing crawl timeout: {}s",
        config.fetch.listing_crawl_timeout_secs
    );
    println!("  Control timeout: {}s", config.fetch.control_timeout_secs);

    println!("\nScheduler:");
    println!("  Poll interval: {}s", config.scheduler.poll_interval_secs);
    println!(
        "  Default interval: {} hour(s)",
        config.scheduler.default_interval_hours
    );
    println!("  Enabled on start: {}", config.scheduler.enabled_on_start);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles `run`: scheduler in the foreground until Ctrl-C
async fn handle_run(controller: &mut Controller) -> Result<(), Box<dyn std::error::Error>> {
    print_schedule(&controller.config()?);

    controller.start();
    tokio::signal::ctrl_c().await?;

    tracing::info!("Interrupt received, waiting for the scheduler to finish");
    controller.stop().await?;
    Ok(())
}

async fn handle_crawl(controller: &Controller) -> Result<(), Box<dyn std::error::Error>> {
    match controller.trigger_listing_crawl().await {
        Ok(report) => {
            println!("Links found: {}", report.links_found);
            println!("  Created: {}", report.created);
            println!("  Changed: {}", report.changed);
            println!("  Unchanged: {}", report.unchanged);
            println!("  Failed: {}", report.failed);
            println!("New versions: {}", report.new_versions());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

async fn handle_crawl_article(
    controller: &Controller,
    url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if controller.trigger_article_crawl(url).await? {
        println!("✓ New version stored for {}", url);
    } else {
        println!("No change for {}", url);
    }
    Ok(())
}

fn handle_stats(controller: &Controller) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", controller.settings().storage.database_path);

    let storage = lock_storage(controller.storage())?;
    let stats = load_statistics(&*storage)?;
    print_statistics(&stats);

    Ok(())
}

fn handle_history(controller: &Controller, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let storage = lock_storage(controller.storage())?;
    match load_history(&*storage, url)? {
        Some(history) => print!("{}", format_history_markdown(&history)),
        None => println!("No article stored for {}", url),
    }
    Ok(())
}

fn print_schedule(config: &CrawlConfig) {
    println!(
        "Scheduled crawling {} every {} hour(s)",
        if config.enabled { "enabled" } else { "disabled" },
        config.interval_hours
    );
    if let Some(next_run) = config.next_run {
        println!("Next crawl at {}", next_run);
    }
}
