//! Replay scheduler: periodically re-enqueues dead-lettered mutations.
//!
//! On a fixed interval the scheduler scans the dead-letter store (bounded
//! batch, oldest failures first), deserializes each payload back into a task,
//! restores the original record identifier, re-enqueues it onto the mutation
//! channel and deletes the entry. Deleting after re-enqueue rather than after
//! re-indexing gives at-least-once delivery; duplicate replays are absorbed
//! by upsert idempotence.
//!
//! Scans never overlap: a tick that fires while a scan is still running is
//! skipped, both by the interval's missed-tick behavior and by an explicit
//! scan guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::channel::MutationSender;
use crate::config::{PoisonPolicy, SyncConfig};
use crate::storage::traits::{DeadLetterEntry, DeadLetterStore};
use crate::task::Task;

/// Periodic dead-letter replay task.
///
/// A single instance per store: entries are claimed only by deletion, so
/// running several schedulers against one store would replay entries more
/// than once per cycle.
pub struct ReplayScheduler {
    store: Arc<dyn DeadLetterStore>,
    tx: MutationSender,
    interval: Duration,
    batch_size: usize,
    poison_policy: PoisonPolicy,
    scanning: AtomicBool,
    shutdown: watch::Receiver<bool>,
}

impl ReplayScheduler {
    pub fn new(
        store: Arc<dyn DeadLetterStore>,
        tx: MutationSender,
        config: &SyncConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            tx,
            interval: Duration::from_secs(config.replay_interval_secs),
            batch_size: config.replay_batch_size,
            poison_policy: config.poison_policy,
            scanning: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Run the timer loop until the shutdown signal fires.
    pub async fn run(mut self) {
        info!(interval = ?self.interval, "starting dead letter replay scheduler");

        // First scan one full period after startup, never immediately
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.replay_once().await;
                }
                _ = self.shutdown.changed() => {
                    info!("dead letter replay scheduler stopping");
                    return;
                }
            }
        }
    }

    /// Perform one replay scan (for manual control instead of the run loop).
    ///
    /// Returns the number of entries re-enqueued. Returns immediately if a
    /// scan is already in progress.
    pub async fn replay_once(&self) -> usize {
        if self.scanning.swap(true, Ordering::AcqRel) {
            debug!("replay scan already in progress, skipping tick");
            crate::metrics::record_replay_skipped();
            return 0;
        }
        let _guard = ScanGuard(&self.scanning);

        let start = std::time::Instant::now();
        let entries = match self.store.scan(self.batch_size).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "failed to scan dead letter store");
                return 0;
            }
        };

        if entries.is_empty() {
            return 0;
        }

        debug!(count = entries.len(), "replaying dead letter entries");
        let mut replayed = 0;

        for entry in entries {
            let entry_id = entry.entry_id;
            let task = match self.decode(entry) {
                Some(task) => task,
                None => continue,
            };

            if self.tx.send(task).await.is_err() {
                // Pipeline is shutting down; remaining entries stay for the
                // next process lifetime
                warn!("mutation channel closed, stopping replay scan");
                break;
            }
            replayed += 1;

            if let Err(err) = self.store.delete(entry_id).await {
                warn!(
                    entry_id,
                    error = %err,
                    "failed to delete replayed dead letter entry"
                );
            }
        }

        if replayed > 0 {
            info!(replayed, "dead letter entries re-enqueued");
            crate::metrics::record_replayed(replayed);
        }
        crate::metrics::record_replay_scan_latency(start.elapsed());

        replayed
    }

    /// Deserialize an entry's payload, applying the poison policy on failure.
    fn decode(&self, entry: DeadLetterEntry) -> Option<Task> {
        match serde_json::from_str::<Task>(&entry.payload) {
            Ok(mut task) => {
                // The row's task_id is authoritative
                task.id = entry.task_id;
                Some(task)
            }
            Err(err) => {
                self.handle_poison(&entry, &err);
                None
            }
        }
    }

    fn handle_poison(&self, entry: &DeadLetterEntry, err: &serde_json::Error) {
        match self.poison_policy {
            PoisonPolicy::Retain => {
                warn!(
                    entry_id = entry.entry_id,
                    task_id = entry.task_id,
                    error = %err,
                    "dead letter payload failed to deserialize, retaining entry"
                );
                crate::metrics::record_poison_entry("retained");
            }
            PoisonPolicy::Discard => {
                warn!(
                    entry_id = entry.entry_id,
                    task_id = entry.task_id,
                    error = %err,
                    "dead letter payload failed to deserialize, discarding entry"
                );
                crate::metrics::record_poison_entry("discarded");
                // Fire-and-forget delete; a failure just means the entry is
                // seen (and logged) again next scan
                let store = self.store.clone();
                let entry_id = entry.entry_id;
                tokio::spawn(async move {
                    if let Err(err) = store.delete(entry_id).await {
                        warn!(entry_id, error = %err, "failed to discard poison entry");
                    }
                });
            }
        }
    }
}

/// RAII guard to reset the scanning flag.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{mutation_channel, MutationReceiver};
    use crate::storage::InMemoryDeadLetterStore;
    use crate::task::TaskStatus;

    fn test_config() -> SyncConfig {
        SyncConfig {
            replay_interval_secs: 1,
            ..Default::default()
        }
    }

    fn scheduler(
        store: Arc<InMemoryDeadLetterStore>,
        config: SyncConfig,
    ) -> (ReplayScheduler, MutationReceiver, watch::Sender<bool>) {
        let (tx, rx) = mutation_channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = ReplayScheduler::new(store, tx, &config, shutdown_rx);
        (scheduler, rx, shutdown_tx)
    }

    async fn park_task(store: &InMemoryDeadLetterStore, id: i64) -> i64 {
        let mut task = Task::new(format!("task-{}", id), "", TaskStatus::Todo).unwrap();
        task.id = id;
        let payload = serde_json::to_string(&task).unwrap();
        store.append(id, &payload, "connection refused", 3).await.unwrap()
    }

    #[tokio::test]
    async fn test_replay_reenqueues_and_deletes() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        park_task(&store, 42).await;

        let (scheduler, mut rx, _shutdown) = scheduler(store.clone(), test_config());

        let replayed = scheduler.replay_once().await;
        assert_eq!(replayed, 1);

        // Entry is gone and exactly one mutation came out
        assert!(store.is_empty());
        let task = rx.recv().await.unwrap();
        assert_eq!(task.id, 42);
        assert_eq!(task.title, "task-42");
    }

    #[tokio::test]
    async fn test_replay_restores_task_id() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        // Payload says id 0 (pre-assignment); the row's task_id wins
        let task = Task::new("orphan", "", TaskStatus::Pending).unwrap();
        let payload = serde_json::to_string(&task).unwrap();
        store.append(77, &payload, "err", 3).await.unwrap();

        let (scheduler, mut rx, _shutdown) = scheduler(store, test_config());
        scheduler.replay_once().await;

        assert_eq!(rx.recv().await.unwrap().id, 77);
    }

    #[tokio::test]
    async fn test_replay_respects_batch_limit() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        for id in 1..=5 {
            park_task(&store, id).await;
        }

        let config = SyncConfig {
            replay_batch_size: 3,
            ..test_config()
        };
        let (scheduler, mut rx, _shutdown) = scheduler(store.clone(), config);

        assert_eq!(scheduler.replay_once().await, 3);
        assert_eq!(store.len(), 2);

        // Oldest failures replay first
        assert_eq!(rx.recv().await.unwrap().id, 1);
        assert_eq!(rx.recv().await.unwrap().id, 2);
        assert_eq!(rx.recv().await.unwrap().id, 3);

        // The rest go on the next tick
        assert_eq!(scheduler.replay_once().await, 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_poison_entry_retained() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        store.append(1, "not json", "err", 3).await.unwrap();
        park_task(&store, 2).await;

        let (scheduler, mut rx, _shutdown) = scheduler(store.clone(), test_config());

        // Poison entry skipped, healthy entry still replays
        assert_eq!(scheduler.replay_once().await, 1);
        assert_eq!(rx.recv().await.unwrap().id, 2);
        assert_eq!(store.len(), 1);
        assert!(store.contains_task(1));

        // And it stays on subsequent scans
        assert_eq!(scheduler.replay_once().await, 0);
        assert!(store.contains_task(1));
    }

    #[tokio::test]
    async fn test_poison_entry_discarded() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        store.append(1, "not json", "err", 3).await.unwrap();

        let config = SyncConfig {
            poison_policy: PoisonPolicy::Discard,
            ..test_config()
        };
        let (scheduler, _rx, _shutdown) = scheduler(store.clone(), config);

        assert_eq!(scheduler.replay_once().await, 0);

        // Discard delete runs on a spawned task
        tokio::time::timeout(Duration::from_secs(1), async {
            while !store.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("poison entry was not discarded");
    }

    #[tokio::test]
    async fn test_scan_in_progress_skips() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        park_task(&store, 1).await;

        let (scheduler, _rx, _shutdown) = scheduler(store.clone(), test_config());

        // Simulate a scan still running
        scheduler.scanning.store(true, Ordering::SeqCst);
        assert_eq!(scheduler.replay_once().await, 0);
        assert_eq!(store.len(), 1);

        scheduler.scanning.store(false, Ordering::SeqCst);
        assert_eq!(scheduler.replay_once().await, 1);
    }

    #[tokio::test]
    async fn test_closed_channel_leaves_entries() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        park_task(&store, 1).await;
        park_task(&store, 2).await;

        let (scheduler, rx, _shutdown) = scheduler(store.clone(), test_config());
        drop(rx);

        assert_eq!(scheduler.replay_once().await, 0);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_run_loop_ticks_and_stops() {
        let store = Arc::new(InMemoryDeadLetterStore::new());
        park_task(&store, 9).await;

        let (scheduler, mut rx, shutdown) = scheduler(store.clone(), test_config());
        let handle = tokio::spawn(scheduler.run());

        // First tick fires one interval after startup
        let task = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("no replay before timeout")
            .unwrap();
        assert_eq!(task.id, 9);
        assert!(store.is_empty());

        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop on shutdown")
            .unwrap();
    }
}
