//! Bounded worker pool
//!
//! Runs submitted futures as Tokio tasks with at most `workers` of them doing
//! work at once. Results are handed back in completion order. A panicking
//! task is reported as [`TaskOutcome::Failed`] and does not affect the others.
//! Tasks that have not started when the stop signal is raised are skipped;
//! tasks already running are left to finish.

use crate::harvester::shutdown::StopSignal;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What became of one submitted task
#[derive(Debug, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),

    /// Never started because a stop was requested first
    Skipped,

    /// The task panicked or was cancelled
    Failed(String),
}

pub struct WorkerPool<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<Option<T>>,
    stop: StopSignal,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Creates a pool running at most `workers` tasks at a time
    pub fn new(workers: usize, stop: StopSignal) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
            stop,
        }
    }

    /// Queues a unit of work
    ///
    /// Returns immediately; the work starts once a worker slot is free.
    pub fn submit<F>(&mut self, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let stop = self.stop.clone();

        self.tasks.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = stop.stopped() => return None,
                permit = permits.acquire_owned() => permit.ok()?,
            };

            if stop.is_stopped() {
                return None;
            }

            Some(work.await)
        });
    }

    /// Number of submitted tasks not yet collected
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for the next task to finish
    ///
    /// Returns `None` once every submitted task has been collected.
    pub async fn next_completed(&mut self) -> Option<TaskOutcome<T>> {
        let joined = self.tasks.join_next().await?;

        Some(match joined {
            Ok(Some(value)) => TaskOutcome::Completed(value),
            Ok(None) => TaskOutcome::Skipped,
            Err(e) => TaskOutcome::Failed(e.to_string()),
        })
    }
}
