//! Output module for harvest reports
//!
//! This module handles:
//! - Loading article and run statistics from storage
//! - Printing statistics to the terminal
//! - Writing markdown summaries of past runs

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::storage::{ArticleStore, RunRecord, StorageError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a summary report shows
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Most recent run, if any has been recorded
    pub latest_run: Option<RunRecord>,

    /// Wall time of the latest run, when it has finished
    pub duration_seconds: Option<u64>,

    pub statistics: HarvestStatistics,
}

/// Builds a report from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing harvest data
///
/// # Returns
///
/// * `Ok(HarvestReport)` - Successfully generated report
/// * `Err(OutputError)` - Failed to query storage
pub fn generate_summary(storage: &dyn ArticleStore) -> OutputResult<HarvestReport> {
    let latest_run = storage.get_latest_run()?;
    let duration_seconds = latest_run.as_ref().and_then(run_duration_seconds);
    let statistics = load_statistics(storage)?;

    Ok(HarvestReport {
        latest_run,
        duration_seconds,
        statistics,
    })
}

fn run_duration_seconds(run: &RunRecord) -> Option<u64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}
