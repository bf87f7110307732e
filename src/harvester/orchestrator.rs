//! Harvest orchestrator - the page loop
//!
//! This module drives a harvest run:
//! - Estimating the resume page from the stored article count
//! - Walking listing pages one at a time
//! - Filtering links that are already stored
//! - Fanning the remaining links out over the worker pool
//! - Recording the run and shutting the store writer down

use crate::config::{validate, Config};
use crate::harvester::extractor::Extractor;
use crate::harvester::fetcher::{FetchResult, Fetcher};
use crate::harvester::paginator::{ListingPaginator, PageLink};
use crate::harvester::pipeline::{process_link, BatchReport, LinkOutcome};
use crate::harvester::pool::{TaskOutcome, WorkerPool};
use crate::harvester::shutdown::StopSignal;
use crate::storage::{DedupStore, RunStatus, StoreWriter};
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Listing page to resume from when `saved` articles are already stored
///
/// Assumes older articles sit on later pages, so roughly `saved / page_size`
/// pages have been consumed.
pub fn resume_page(saved: u64, page_size: u64) -> u64 {
    (saved / page_size.max(1)).max(1)
}

/// Final report of a harvest run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub run_id: i64,
    pub start_page: u64,
    /// Last listing page visited, or the start page if none was
    pub last_page: u64,
    pub pages_visited: u64,
    pub saved_at_start: u64,
    pub saved_total: u64,
    pub saved_this_run: u64,
    pub goal_reached: bool,
    pub totals: BatchReport,
}

/// Main harvester structure
pub struct Harvester {
    config: Config,
    config_hash: String,
    stop: StopSignal,
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    paginator: ListingPaginator,
    store: DedupStore,
    writer: StoreWriter,
}

impl Harvester {
    /// Creates a harvester and opens its store
    ///
    /// Must be called from within a Tokio runtime since the store writer is
    /// started here.
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `stop` - Signal that ends the run early
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration, unusable database or HTTP client
    pub fn new(config: Config, stop: StopSignal) -> Result<Self> {
        validate(&config)?;

        let fetcher = Fetcher::new(&config.fetch)?;
        let extractor = Extractor::new(&config.extract)?;
        let paginator = ListingPaginator::new(&config.site)?;
        let (store, writer) = DedupStore::open(
            Path::new(&config.storage.database_path),
            config.storage.writer_queue,
        )?;

        Ok(Self {
            config,
            config_hash: String::new(),
            stop,
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            paginator,
            store,
            writer,
        })
    }

    /// Sets the configuration fingerprint recorded with the run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Page the next run will start from
    pub fn starting_page(&self) -> Result<u64> {
        let saved = self.store.count()?;
        Ok(resume_page(saved, self.config.harvest.page_size))
    }

    /// Runs until the goal is reached or a stop is requested
    pub async fn run(self) -> Result<HarvestSummary> {
        let Self {
            config,
            config_hash,
            stop,
            fetcher,
            extractor,
            paginator,
            store,
            writer,
        } = self;
        let harvest = &config.harvest;

        let saved_at_start = store.count()?;
        let start_page = resume_page(saved_at_start, harvest.page_size);
        let run_id = store.create_run(&config_hash, start_page).await?;

        tracing::info!(
            "Starting harvest run {}: {} articles stored, goal {}, starting at page {}",
            run_id,
            saved_at_start,
            harvest.goal_total,
            start_page
        );

        let started = Instant::now();
        let mut saved = saved_at_start;
        let mut page = start_page;
        let mut last_page = start_page;
        let mut pages_visited = 0;
        let mut totals = BatchReport::default();

        while saved < harvest.goal_total && !stop.is_stopped() {
            let target = paginator.page_target(page);
            last_page = page;
            pages_visited += 1;

            let listing = match fetcher.fetch(target.as_str()).await {
                FetchResult::Success { body, .. } => body,
                FetchResult::NotFound => {
                    tracing::warn!("Listing page {} not found, moving on", page);
                    page += 1;
                    continue;
                }
                FetchResult::Exhausted { last_error, .. } => {
                    tracing::warn!("Listing page {} unavailable ({}), moving on", page, last_error);
                    page += 1;
                    continue;
                }
            };

            let links = paginator.extract_links(&listing, page);
            if links.is_empty() {
                tracing::warn!(
                    "No article links on page {}, pausing for {:?}",
                    page,
                    harvest.empty_page_pause()
                );
                stop.sleep(harvest.empty_page_pause()).await;
                page += 1;
                continue;
            }

            let found = links.len();
            let fresh = filter_known(&store, links);
            tracing::info!("Page {}: {} links, {} new", page, found, fresh.len());

            if !fresh.is_empty() {
                let report = dispatch_page(
                    fresh,
                    &fetcher,
                    &extractor,
                    &store,
                    &stop,
                    harvest.workers,
                    harvest.progress_every,
                    &mut saved,
                )
                .await;

                tracing::debug!("Page {} finished: {:?}", page, report);
                totals.merge(&report);
            }

            stop.sleep(harvest.page_pause()).await;
            page += 1;
        }

        let goal_reached = saved >= harvest.goal_total;
        let status = if goal_reached {
            RunStatus::Completed
        } else {
            RunStatus::Interrupted
        };
        let saved_this_run = saved - saved_at_start;

        if let Err(e) = store
            .finish_run(run_id, status, last_page, saved_this_run)
            .await
        {
            tracing::error!("Failed to record the end of run {}: {}", run_id, e);
        }

        drop(store);
        let written = writer.finish().await;
        tracing::debug!("Store writer drained, {} rows written", written);

        tracing::info!(
            "Harvest run {} {}: {} saved this run, {} total, pages {}..={} in {:?}",
            run_id,
            status.to_db_string(),
            saved_this_run,
            saved,
            start_page,
            last_page,
            started.elapsed()
        );

        Ok(HarvestSummary {
            run_id,
            start_page,
            last_page,
            pages_visited,
            saved_at_start,
            saved_total: saved,
            saved_this_run,
            goal_reached,
            totals,
        })
    }
}

/// Drops links whose URL is already stored
///
/// A failed lookup keeps the link; the insert is idempotent anyway.
fn filter_known(store: &DedupStore, links: Vec<PageLink>) -> Vec<PageLink> {
    links
        .into_iter()
        .filter(|link| match store.exists(&link.url) {
            Ok(known) => !known,
            Err(e) => {
                tracing::warn!("Lookup failed for {}: {}", link.url, e);
                true
            }
        })
        .collect()
}

/// Processes one page worth of links and tallies the outcomes
#[allow(clippy::too_many_arguments)]
async fn dispatch_page(
    links: Vec<PageLink>,
    fetcher: &Arc<Fetcher>,
    extractor: &Arc<Extractor>,
    store: &DedupStore,
    stop: &StopSignal,
    workers: usize,
    progress_every: u64,
    saved: &mut u64,
) -> BatchReport {
    let mut pool = WorkerPool::new(workers, stop.clone());

    for link in links {
        pool.submit(process_link(
            link,
            Arc::clone(fetcher),
            Arc::clone(extractor),
            store.clone(),
        ));
    }

    let mut report = BatchReport::default();

    while let Some(outcome) = pool.next_completed().await {
        report.record(&outcome);

        match &outcome {
            TaskOutcome::Completed(LinkOutcome::Saved(record)) => {
                *saved += 1;
                tracing::debug!("Saved {}", record.url);
                if *saved % progress_every.max(1) == 0 {
                    tracing::info!("Milestone: {} articles stored", saved);
                }
            }
            TaskOutcome::Completed(LinkOutcome::WriteFailed(e)) => {
                tracing::warn!("Write failed: {}", e);
            }
            TaskOutcome::Completed(LinkOutcome::FetchFailed(e)) => {
                tracing::debug!("Fetch failed: {}", e);
            }
            TaskOutcome::Failed(e) => {
                tracing::error!("Link task failed: {}", e);
            }
            _ => {}
        }
    }

    report
}

/// Runs a complete harvest
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Fingerprint of the configuration file
/// * `stop` - Signal that ends the run early
pub async fn run_harvest(
    config: Config,
    config_hash: &str,
    stop: StopSignal,
) -> Result<HarvestSummary> {
    Harvester::new(config, stop)?
        .with_config_hash(config_hash)
        .run()
        .await
}
