//! Single-writer article store
//!
//! Workers share a [`DedupStore`] handle. Lookups go through a dedicated read
//! connection; every write is sent as a command to one writer task that owns
//! the only write connection, so at most one write touches the database at a
//! time no matter how many workers are running.

use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{ArticleCandidate, ArticleRecord, InsertOutcome, RunStatus};
use crate::HarvestError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Commands accepted by the writer task
enum WriteCommand {
    Insert {
        candidate: ArticleCandidate,
        reply: oneshot::Sender<InsertOutcome>,
    },
    CreateRun {
        config_hash: String,
        start_page: u64,
        reply: oneshot::Sender<StorageResult<i64>>,
    },
    FinishRun {
        run_id: i64,
        status: RunStatus,
        last_page: u64,
        saved_count: u64,
        reply: oneshot::Sender<StorageResult<()>>,
    },
}

/// Cloneable handle to the article store
#[derive(Clone)]
pub struct DedupStore {
    reader: Arc<Mutex<SqliteStorage>>,
    writes: mpsc::Sender<WriteCommand>,
}

/// The running writer task
///
/// Await [`StoreWriter::finish`] after every [`DedupStore`] clone has been
/// dropped to let queued writes drain.
pub struct StoreWriter {
    task: JoinHandle<u64>,
}

impl DedupStore {
    /// Opens the database at `path` and starts its writer task
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `queue_depth` - Number of writes that may wait for the writer
    pub fn open(path: &Path, queue_depth: usize) -> Result<(Self, StoreWriter), HarvestError> {
        let write_storage = SqliteStorage::new(path)?;
        let read_storage = SqliteStorage::new(path)?;

        let (writes, commands) = mpsc::channel(queue_depth.max(1));
        let task = tokio::task::spawn_blocking(move || run_writer(write_storage, commands));

        let store = Self {
            reader: Arc::new(Mutex::new(read_storage)),
            writes,
        };

        Ok((store, StoreWriter { task }))
    }

    fn reader(&self) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Database("read connection lock poisoned".to_string()))
    }

    /// Returns true if an article with this URL is already stored
    pub fn exists(&self, url: &str) -> StorageResult<bool> {
        self.reader()?.article_exists(url)
    }

    /// Counts stored articles
    pub fn count(&self) -> StorageResult<u64> {
        self.reader()?.count_articles()
    }

    /// Gets a stored article by URL
    pub fn get(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
        self.reader()?.get_article_by_url(url)
    }

    /// Hands a candidate to the writer and waits for the verdict
    ///
    /// Never fails: storage errors and a stopped writer are reported as
    /// `InsertOutcome::WriteFailure`.
    pub async fn insert(&self, candidate: ArticleCandidate) -> InsertOutcome {
        let (reply, verdict) = oneshot::channel();

        if self
            .writes
            .send(WriteCommand::Insert { candidate, reply })
            .await
            .is_err()
        {
            return InsertOutcome::WriteFailure(StorageError::WriterClosed.to_string());
        }

        verdict
            .await
            .unwrap_or_else(|_| InsertOutcome::WriteFailure(StorageError::WriterClosed.to_string()))
    }

    /// Records the start of a harvest run
    pub async fn create_run(&self, config_hash: &str, start_page: u64) -> StorageResult<i64> {
        let (reply, result) = oneshot::channel();
        self.writes
            .send(WriteCommand::CreateRun {
                config_hash: config_hash.to_string(),
                start_page,
                reply,
            })
            .await
            .map_err(|_| StorageError::WriterClosed)?;
        result.await.map_err(|_| StorageError::WriterClosed)?
    }

    /// Records the end of a harvest run
    pub async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        last_page: u64,
        saved_count: u64,
    ) -> StorageResult<()> {
        let (reply, result) = oneshot::channel();
        self.writes
            .send(WriteCommand::FinishRun {
                run_id,
                status,
                last_page,
                saved_count,
                reply,
            })
            .await
            .map_err(|_| StorageError::WriterClosed)?;
        result.await.map_err(|_| StorageError::WriterClosed)?
    }
}

impl StoreWriter {
    /// Waits for the writer to drain its queue and stop
    ///
    /// # Returns
    ///
    /// The number of articles the writer inserted during its lifetime
    pub async fn finish(self) -> u64 {
        match self.task.await {
            Ok(inserted) => inserted,
            Err(e) => {
                tracing::error!("Store writer task failed: {}", e);
                0
            }
        }
    }
}

/// Writer loop; runs until every sender is dropped
fn run_writer(mut storage: SqliteStorage, mut commands: mpsc::Receiver<WriteCommand>) -> u64 {
    let mut inserted = 0;

    while let Some(command) = commands.blocking_recv() {
        match command {
            WriteCommand::Insert { candidate, reply } => {
                let outcome = match storage.insert_article(&candidate) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!("Failed to store {}: {}", candidate.url, e);
                        InsertOutcome::WriteFailure(e.to_string())
                    }
                };

                if outcome.is_inserted() {
                    inserted += 1;
                }

                // The requester may have gone away; the write stands regardless
                let _ = reply.send(outcome);
            }

            WriteCommand::CreateRun {
                config_hash,
                start_page,
                reply,
            } => {
                let _ = reply.send(storage.create_run(&config_hash, start_page));
            }

            WriteCommand::FinishRun {
                run_id,
                status,
                last_page,
                saved_count,
                reply,
            } => {
                let _ = reply.send(storage.finish_run(run_id, status, last_page, saved_count));
            }
        }
    }

    tracing::debug!("Store writer stopped after {} inserts", inserted);
    inserted
}
