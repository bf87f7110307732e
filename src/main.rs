//! Article Harvester main entry point
//!
//! This is the command-line interface for the incremental article harvester.

use anyhow::Context;
use article_harvester::config::{load_config_with_hash, Config};
use article_harvester::harvester::{resume_page, run_harvest, stop_channel, ListingPaginator};
use article_harvester::output::{
    generate_markdown_summary, generate_summary, load_statistics, print_statistics,
};
use article_harvester::storage::{open_storage, ArticleStore};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Article Harvester: an incremental article collector
///
/// Walks a paginated article listing, fetches articles it has not stored yet
/// and saves them to SQLite until the configured goal is reached. Progress is
/// kept in the database, so an interrupted harvest resumes where it left off.
#[derive(Parser, Debug)]
#[command(name = "article-harvester")]
#[command(version = "1.0.0")]
#[command(about = "An incremental article harvester", long_about = None)]
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

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Write a markdown summary of the database to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export_summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export_summary {
        handle_export_summary(&config, path)?;
    } else {
        handle_harvest(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("article_harvester=info,warn"),
            1 => EnvFilter::new("article_harvester=debug,info"),
            2 => EnvFilter::new("article_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration and first listing pages
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Article Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Root: {}", config.site.root);
    println!("  Listing path: {}", config.site.listing_path);
    println!("  Page parameter: {}", config.site.page_param);
    println!("  Link selector: {}", config.site.link_selector);

    println!("\nHarvest:");
    println!("  Goal: {} articles", config.harvest.goal_total);
    println!("  Workers: {}", config.harvest.workers);
    println!("  Page size: {}", config.harvest.page_size);
    println!("  Page pause: {}ms", config.harvest.page_pause_ms);
    println!("  Empty page pause: {}ms", config.harvest.empty_page_pause_ms);

    println!("\nFetch:");
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Attempt timeout: {}ms", config.fetch.attempt_timeout_ms);
    println!("  Backoff base: {}ms", config.fetch.backoff_base_ms);
    println!(
        "  Jitter: {}..{}ms",
        config.fetch.jitter_min_ms, config.fetch.jitter_max_ms
    );
    println!("  Identities: {}", config.fetch.identities.len());

    println!("\nExtract:");
    println!("  Title: {}", config.extract.title_selector);
    println!("  Content: {}", config.extract.content_selectors.join(", "));
    println!("  Noise: {}", config.extract.noise_selectors.join(", "));
    println!("  Fallback: {}", config.extract.fallback_selector);
    println!("  Minimum body: {} characters", config.extract.min_body_chars);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    // Only read an existing database; a dry run never creates one
    let database = Path::new(&config.storage.database_path);
    let stored = if database.exists() {
        open_storage(database)?.count_articles()?
    } else {
        0
    };
    let start_page = resume_page(stored, config.harvest.page_size);

    let paginator = ListingPaginator::new(&config.site)?;
    println!("\n✓ Configuration is valid");
    println!(
        "✓ {} articles stored, would start at page {}:",
        stored, start_page
    );
    for page in start_page..start_page + 3 {
        println!("  {}", paginator.page_target(page));
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: writes a markdown summary
fn handle_export_summary(config: &Config, output: &Path) -> anyhow::Result<()> {
    println!("=== Exporting Harvest Summary ===\n");
    println!("Database: {}", config.storage.database_path);
    println!("Output: {}", output.display());
    println!();

    let storage = open_storage(Path::new(&config.storage.database_path))?;

    tracing::info!("Loading harvest data from database...");
    let report = generate_summary(&storage)?;

    generate_markdown_summary(&report, output)
        .with_context(|| format!("Failed to write summary to {}", output.display()))?;

    println!("✓ Summary exported to: {}", output.display());

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with {} workers, goal {} articles",
        config.site.root,
        config.harvest.workers,
        config.harvest.goal_total
    );

    let (stop, signal) = stop_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received");
                stop.stop();
            }
            Err(e) => tracing::error!("Unable to listen for interrupt signal: {}", e),
        }
    });

    let summary = run_harvest(config, config_hash, signal)
        .await
        .context("Harvest failed")?;

    if summary.goal_reached {
        tracing::info!(
            "Goal reached: {} articles stored ({} new)",
            summary.saved_total,
            summary.saved_this_run
        );
    } else {
        tracing::info!(
            "Harvest interrupted at page {}: {} articles stored ({} new)",
            summary.last_page,
            summary.saved_total,
            summary.saved_this_run
        );
    }

    let totals = &summary.totals;
    tracing::info!(
        "Links: {} saved, {} duplicate, {} rejected, {} not found, {} failed, {} write failures, {} skipped, {} panicked",
        totals.saved,
        totals.duplicates,
        totals.rejected,
        totals.not_found,
        totals.failed,
        totals.write_failures,
        totals.skipped,
        totals.panicked
    );

    Ok(())
}
