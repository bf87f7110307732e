//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{ArticleCandidate, ArticleRecord, InsertOutcome, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store writer is not running")]
    WriterClosed,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Reads take `&self`; writes take `&mut self` so a backend can only be
/// written through whoever owns it exclusively.
pub trait ArticleStore {
    // ===== Articles =====

    /// Returns true if an article with this exact URL is stored
    fn article_exists(&self, url: &str) -> StorageResult<bool>;

    /// Inserts the candidate unless its URL is already stored
    ///
    /// A URL collision is reported as `InsertOutcome::AlreadyExists`, never as
    /// an error. Identifier, creation time and the reserved counters are
    /// assigned here.
    fn insert_article(&mut self, candidate: &ArticleCandidate) -> StorageResult<InsertOutcome>;

    /// Gets an article by URL
    fn get_article_by_url(&self, url: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Counts all stored articles
    fn count_articles(&self) -> StorageResult<u64>;

    /// Gets the most recently stored articles, newest first
    fn latest_articles(&self, limit: usize) -> StorageResult<Vec<ArticleRecord>>;

    // ===== Run Management =====

    /// Creates a new harvest run in the running state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, start_page: u64) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets up to `limit` runs, newest first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    /// Marks a run as finished with its final status and progress
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        last_page: u64,
        saved_count: u64,
    ) -> StorageResult<()>;
}
