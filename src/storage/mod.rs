//! Storage module for persisting harvested articles
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Idempotent article inserts keyed by URL
//! - The single-writer store used by concurrent workers
//! - Run tracking for reporting

mod schema;
mod sqlite;
mod traits;
mod writer;

pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, StorageError, StorageResult};
pub use writer::{DedupStore, StoreWriter};

use crate::HarvestError;
use chrono::{SecondsFormat, Utc};
use std::path::Path;
use uuid::Uuid;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Fields extracted from an article page, before the store accepts it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCandidate {
    pub title: String,
    pub description: String,
    pub url: String,
    pub published_at: Option<String>,
}

/// A stored article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    /// Free text as found on the page; no format is guaranteed
    pub published_at: Option<String>,
    /// Reserved, always 0 at creation
    pub comment_count: i64,
    /// RFC 3339 UTC timestamp of the insert
    pub created_at: String,
    /// Reserved, always 0 at creation
    pub rating: i64,
}

impl ArticleRecord {
    /// Assigns a fresh identifier and creation time to a candidate
    pub fn from_candidate(candidate: &ArticleCandidate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: candidate.title.clone(),
            description: candidate.description.clone(),
            url: candidate.url.clone(),
            published_at: candidate.published_at.clone(),
            comment_count: 0,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            rating: 0,
        }
    }
}

/// Result of handing a candidate to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted(ArticleRecord),

    /// The URL was already stored; nothing was written
    AlreadyExists,

    /// The write failed for a reason other than uniqueness
    WriteFailure(String),
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub start_page: u64,
    pub last_page: Option<u64>,
    pub saved_count: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
