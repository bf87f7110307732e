//! Per-link processing
//!
//! Each candidate link runs fetch → extract → insert as one unit of work.
//! Every step reports an explicit outcome; nothing here is fatal to the run.

use crate::harvester::extractor::{Extraction, Extractor, RejectReason};
use crate::harvester::fetcher::{FetchResult, Fetcher};
use crate::harvester::paginator::PageLink;
use crate::harvester::pool::TaskOutcome;
use crate::storage::{ArticleRecord, DedupStore, InsertOutcome};
use std::sync::Arc;

/// What happened to one candidate link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Saved(ArticleRecord),
    Duplicate,
    WriteFailed(String),
    Rejected(RejectReason),
    NotFound,
    FetchFailed(String),
}

/// Runs one link through fetch, extraction and storage
pub async fn process_link(
    link: PageLink,
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    store: DedupStore,
) -> LinkOutcome {
    let body = match fetcher.fetch(&link.url).await {
        FetchResult::Success { body, .. } => body,
        FetchResult::NotFound => return LinkOutcome::NotFound,
        FetchResult::Exhausted {
            attempts,
            last_error,
        } => {
            return LinkOutcome::FetchFailed(format!(
                "{} after {} attempts",
                last_error, attempts
            ));
        }
    };

    // The key is the URL as listed, not the post-redirect URL
    let candidate = match extractor.extract(&body, &link.url) {
        Extraction::Accepted(candidate) => candidate,
        Extraction::Rejected(reason) => {
            tracing::debug!("Rejected {}: {}", link.url, reason);
            return LinkOutcome::Rejected(reason);
        }
    };

    match store.insert(candidate).await {
        InsertOutcome::Inserted(record) => LinkOutcome::Saved(record),
        InsertOutcome::AlreadyExists => LinkOutcome::Duplicate,
        InsertOutcome::WriteFailure(error) => LinkOutcome::WriteFailed(error),
    }
}

/// Tally of link outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub saved: u64,
    pub duplicates: u64,
    pub write_failures: u64,
    pub rejected: u64,
    pub not_found: u64,
    pub failed: u64,
    /// Tasks that never ran because of a stop
    pub skipped: u64,
    pub panicked: u64,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &TaskOutcome<LinkOutcome>) {
        match outcome {
            TaskOutcome::Completed(LinkOutcome::Saved(_)) => self.saved += 1,
            TaskOutcome::Completed(LinkOutcome::Duplicate) => self.duplicates += 1,
            TaskOutcome::Completed(LinkOutcome::WriteFailed(_)) => self.write_failures += 1,
            TaskOutcome::Completed(LinkOutcome::Rejected(_)) => self.rejected += 1,
            TaskOutcome::Completed(LinkOutcome::NotFound) => self.not_found += 1,
            TaskOutcome::Completed(LinkOutcome::FetchFailed(_)) => self.failed += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Failed(_) => self.panicked += 1,
        }
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.saved += other.saved;
        self.duplicates += other.duplicates;
        self.write_failures += other.write_failures;
        self.rejected += other.rejected;
        self.not_found += other.not_found;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.panicked += other.panicked;
    }

    /// Number of links accounted for
    pub fn total(&self) -> u64 {
        self.saved
            + self.duplicates
            + self.write_failures
            + self.rejected
            + self.not_found
            + self.failed
            + self.skipped
            + self.panicked
    }
}
