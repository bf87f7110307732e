//! Statistics from the article database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::output::OutputResult;
use crate::storage::{ArticleRecord, ArticleStore, RunRecord};

/// Number of runs shown in statistics
pub const RECENT_RUNS: usize = 10;

/// Number of articles shown in statistics
pub const RECENT_ARTICLES: usize = 10;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Most recent runs, newest first
    pub runs: Vec<RunRecord>,

    /// Most recently stored articles, newest first
    pub latest_articles: Vec<ArticleRecord>,
}

impl HarvestStatistics {
    /// Articles saved across the listed runs
    pub fn saved_by_listed_runs(&self) -> u64 {
        self.runs.iter().map(|run| run.saved_count).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn ArticleStore) -> OutputResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        total_articles: storage.count_articles()?,
        runs: storage.list_runs(RECENT_RUNS)?,
        latest_articles: storage.latest_articles(RECENT_ARTICLES)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Stored articles: {}", stats.total_articles);
    println!("  Recorded runs shown: {}", stats.runs.len());
    println!();

    if !stats.runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.runs {
            println!(
                "  #{} {} pages {}..{} saved {} (started {})",
                run.id,
                run.status.to_db_string(),
                run.start_page,
                run.last_page
                    .map(|page| page.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                run.saved_count,
                run.started_at
            );
        }
        println!();
    }

    if !stats.latest_articles.is_empty() {
        println!("Latest Articles:");
        for article in &stats.latest_articles {
            println!("  - {} ({})", article.title, article.url);
        }
        println!();
    }
}
