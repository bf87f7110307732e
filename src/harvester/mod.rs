//! Harvester module for listing traversal and article processing
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retries and identity rotation
//! - Article extraction from detail pages
//! - Listing pagination and link extraction
//! - The bounded worker pool and stop signal
//! - Overall run orchestration

mod extractor;
mod fetcher;
mod orchestrator;
mod paginator;
mod pipeline;
mod pool;
mod shutdown;

pub use extractor::{Extraction, Extractor, RejectReason};
pub use fetcher::{build_http_client, AttemptFailure, FetchResult, Fetcher, RetryPolicy};
pub use orchestrator::{resume_page, run_harvest, HarvestSummary, Harvester};
pub use paginator::{ListingPaginator, PageLink};
pub use pipeline::{process_link, BatchReport, LinkOutcome};
pub use pool::{TaskOutcome, WorkerPool};
pub use shutdown::{stop_channel, StopHandle, StopSignal};
