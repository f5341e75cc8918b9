use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("dead letter backend error: {0}")]
    Backend(String),
}

/// A mutation that exhausted its upsert retries, as persisted in the
/// dead-letter store.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterEntry {
    /// Store-assigned row id.
    pub entry_id: i64,
    /// Identifier of the task the payload describes.
    pub task_id: i64,
    /// Serialized task JSON; must round-trip back to a `Task`.
    pub payload: String,
    /// Message of the error observed on the final attempt.
    pub error: String,
    /// Retry count at the time of dead-lettering (the configured maximum).
    pub retry_count: u32,
    /// Epoch millis of the failure; the store's scan ordering key.
    pub failed_at: i64,
}

/// Durable side-store for mutations that permanently failed indexing.
///
/// Shared between the sync worker (append) and the replay scheduler
/// (scan/delete). Each operation is independently atomic; no cross-operation
/// transaction is required, and deleting an entry that is already gone is a
/// no-op.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    /// Persist a failed mutation. Returns the store-assigned entry id.
    async fn append(
        &self,
        task_id: i64,
        payload: &str,
        error: &str,
        retry_count: u32,
    ) -> Result<i64, StorageError>;

    /// Fetch up to `limit` entries in stable store-native order (oldest
    /// failure first). Each call re-scans current contents.
    async fn scan(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, StorageError>;

    /// Remove an entry by id. Missing entries are tolerated as a no-op.
    async fn delete(&self, entry_id: i64) -> Result<(), StorageError>;
}
