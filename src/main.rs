//! Vitrine main entry point
//!
//! This is the command-line interface for the Vitrine product crawler.

use anyhow::Context;
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vitrine::config::{load_config_with_hash, Config};
use vitrine::crawler::{run_crawl, ShutdownFlag};
use vitrine::output::{load_progress, print_progress};
use vitrine::storage::{delete_store, open_frontier};
use vitrine::CrawlState;

/// Vitrine: a resumable single-domain product crawler
///
/// Vitrine crawls one site breadth-first from a seed URL, visits product
/// pages before anything else, and writes product records to a CSV file.
/// The frontier lives in SQLite, so an interrupted crawl resumes where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(version)]
#[command(about = "A resumable single-domain product crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show frontier progress from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Delete the crawl database after the crawl without asking
    #[arg(long, conflicts_with = "keep_state")]
    delete_state: bool,

    /// Keep the crawl database after the crawl without asking
    #[arg(long, conflicts_with = "delete_state")]
    keep_state: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("vitrine=info,warn"),
            1 => EnvFilter::new("vitrine=debug,info"),
            2 => EnvFilter::new("vitrine=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let target = config.crawl_target()?;

    println!("=== Vitrine Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", target.base_url);
    println!("  Domain: {}", target.domain);
    println!("  Seed: {}", config.seed_url());
    println!("  Product pattern: {}", target.product_pattern);

    println!("\nCrawler:");
    println!("  Busy retry delay: {:?}", config.busy_retry_delay());
    match config.crawler.max_busy_retries {
        Some(max) => println!("  Max busy retries: {}", max),
        None => println!("  Max busy retries: unbounded"),
    }
    println!("  Request timeout: {:?}", config.request_timeout());
    println!("  Progress every: {} pages", config.crawler.progress_interval);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    let database = config.database_path();
    println!(
        "  Database: {}{}",
        database.display(),
        if database.exists() { " (exists, crawl would resume)" } else { "" }
    );
    println!("  Records: {}", config.records_path().display());

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows frontier progress from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config.database_path();
    if !path.exists() {
        anyhow::bail!("No crawl database at {}", path.display());
    }

    println!("Database: {}\n", path.display());

    let target = config.crawl_target()?;
    let store = open_frontier(config, &target)?;
    let progress = load_progress(&store)?;
    store.close()?;

    print_progress(&progress);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let database = config.database_path();
    if database.exists() {
        tracing::info!("Found {}, resuming crawl", database.display());
    } else {
        tracing::info!("Starting new crawl in {}", database.display());
    }

    let shutdown = ShutdownFlag::new();
    shutdown.listen_for_ctrl_c();

    let report = run_crawl(config, shutdown).await.context("Crawl failed")?;

    println!(
        "Crawl {}: {} pages visited ({} fetch failures), {} products recorded, {} new links, {:.1?}",
        report.state,
        report.pages_visited,
        report.fetch_failures,
        report.records_written,
        report.links_discovered,
        report.elapsed
    );

    if matches!(report.state, CrawlState::Completed | CrawlState::Interrupted)
        && should_delete_state(cli)?
    {
        if delete_store(&database)? {
            println!("Deleted {}", database.display());
        }
    }

    Ok(())
}

/// Decides whether to delete the crawl database, asking when no flag decides
fn should_delete_state(cli: &Cli) -> anyhow::Result<bool> {
    if cli.delete_state {
        return Ok(true);
    }
    if cli.keep_state {
        return Ok(false);
    }

    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Delete the crawl database?")
        .default(false)
        .interact()?)
}
