use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::traits::{DeadLetterEntry, DeadLetterStore, StorageError};
use async_trait::async_trait;

/// Dead-letter store backed by a map, for tests.
pub struct InMemoryDeadLetterStore {
    entries: DashMap<i64, DeadLetterEntry>,
    next_id: AtomicI64,
}

impl InMemoryDeadLetterStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Get current entry count
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry references the given task id.
    #[must_use]
    pub fn contains_task(&self, task_id: i64) -> bool {
        self.entries.iter().any(|e| e.task_id == task_id)
    }
}

impl Default for InMemoryDeadLetterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn append(
        &self,
        task_id: i64,
        payload: &str,
        error: &str,
        retry_count: u32,
    ) -> Result<i64, StorageError> {
        let entry_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            entry_id,
            DeadLetterEntry {
                entry_id,
                task_id,
                payload: payload.to_string(),
                error: error.to_string(),
                retry_count,
                failed_at: Utc::now().timestamp_millis(),
            },
        );
        Ok(entry_id)
    }

    async fn scan(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, StorageError> {
        let mut entries: Vec<DeadLetterEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| (e.failed_at, e.entry_id));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn delete(&self, entry_id: i64) -> Result<(), StorageError> {
        self.entries.remove(&entry_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = InMemoryDeadLetterStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let store = InMemoryDeadLetterStore::new();

        let first = store.append(1, "{}", "err", 3).await.unwrap();
        let second = store.append(2, "{}", "err", 3).await.unwrap();

        assert!(second > first);
        assert_eq!(store.len(), 2);
        assert!(store.contains_task(1));
        assert!(store.contains_task(2));
        assert!(!store.contains_task(3));
    }

    #[tokio::test]
    async fn test_scan_order_and_limit() {
        let store = InMemoryDeadLetterStore::new();

        for task_id in 1..=4 {
            store.append(task_id, "{}", "err", 3).await.unwrap();
        }

        let all = store.scan(100).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|e| e.task_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        let limited = store.scan(2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].task_id, 1);
    }

    #[tokio::test]
    async fn test_delete_is_noop_when_missing() {
        let store = InMemoryDeadLetterStore::new();

        let entry_id = store.append(1, "{}", "err", 3).await.unwrap();
        store.delete(entry_id).await.unwrap();
        assert!(store.is_empty());

        // Deleting again is fine
        store.delete(entry_id).await.unwrap();
    }
}
