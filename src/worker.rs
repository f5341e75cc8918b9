//! Sync worker: drains the mutation channel into the search index.
//!
//! One mutation at a time: build the index document, upsert with bounded
//! retry, and on exhaustion park the mutation in the dead-letter store. A
//! dead-lettered mutation never blocks the ones behind it, and no failure
//! propagates back to the write path.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::channel::MutationReceiver;
use crate::config::SyncConfig;
use crate::index::{IndexClient, IndexError, TaskDocument};
use crate::resilience::retry::{retry, RetryConfig};
use crate::storage::traits::DeadLetterStore;
use crate::task::Task;

/// Single consumer of the mutation channel.
///
/// Runs for the process lifetime; the loop ends cleanly when the channel is
/// closed and drained.
pub struct SyncWorker {
    rx: MutationReceiver,
    index: Arc<dyn IndexClient>,
    dead_letter: Arc<dyn DeadLetterStore>,
    retry_config: RetryConfig,
    max_retries: u32,
}

impl SyncWorker {
    pub fn new(
        rx: MutationReceiver,
        index: Arc<dyn IndexClient>,
        dead_letter: Arc<dyn DeadLetterStore>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            rx,
            index,
            dead_letter,
            retry_config: RetryConfig::index_upsert(
                config.max_retries,
                Duration::from_millis(config.retry_delay_ms),
            ),
            max_retries: config.max_retries,
        }
    }

    /// Run the worker loop until the mutation channel closes.
    pub async fn run(mut self) {
        info!("starting index sync worker");

        while let Some(task) = self.rx.recv().await {
            self.process(task).await;
        }

        info!("mutation channel closed, index sync worker exiting");
    }

    async fn process(&self, task: Task) {
        let start = std::time::Instant::now();
        let doc = TaskDocument::from(&task);

        let outcome = retry("index_upsert", &self.retry_config, || async {
            match self.index.upsert(task.id, &doc).await {
                Ok(()) => {
                    crate::metrics::record_upsert_attempt("success");
                    Ok(())
                }
                Err(err) => {
                    crate::metrics::record_upsert_attempt("error");
                    Err(err)
                }
            }
        })
        .await;

        match outcome {
            Ok(()) => {
                debug!(task_id = task.id, "task indexed");
                crate::metrics::record_mutation("success");
            }
            Err(err) => {
                warn!(
                    task_id = task.id,
                    error = %err,
                    "failed to index task after retries, sending to dead letter store"
                );
                self.store_dead_letter(&task, &err).await;
                crate::metrics::record_mutation("dead_lettered");
            }
        }

        crate::metrics::record_mutation_latency(start.elapsed());
    }

    async fn store_dead_letter(&self, task: &Task, err: &IndexError) {
        let payload = match serde_json::to_string(task) {
            Ok(payload) => payload,
            Err(serde_err) => {
                error!(
                    task_id = task.id,
                    error = %serde_err,
                    "failed to serialize task for dead letter store, mutation lost"
                );
                crate::metrics::record_dead_letter_append_failure();
                return;
            }
        };

        match self
            .dead_letter
            .append(task.id, &payload, &err.to_string(), self.max_retries)
            .await
        {
            Ok(entry_id) => {
                info!(task_id = task.id, entry_id, "task parked in dead letter store");
            }
            Err(store_err) => {
                // The write already succeeded against the primary store, so
                // losing the entry here loses only the sync signal.
                error!(
                    task_id = task.id,
                    error = %store_err,
                    "failed to append to dead letter store, mutation lost"
                );
                crate::metrics::record_dead_letter_append_failure();
            }
        }
    }
}
