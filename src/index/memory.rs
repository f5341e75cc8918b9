//! In-memory index client for tests.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{IndexClient, IndexError, TaskDocument};
use async_trait::async_trait;

/// Index client backed by a map, with an upsert call counter and a
/// scriptable failure budget for exercising the retry and dead-letter paths.
pub struct InMemoryIndexClient {
    docs: DashMap<i64, TaskDocument>,
    calls: AtomicUsize,
    fail_budget: AtomicUsize,
}

impl InMemoryIndexClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            calls: AtomicUsize::new(0),
            fail_budget: AtomicUsize::new(0),
        }
    }

    /// A client whose next `times` upsert calls fail, then heal.
    #[must_use]
    pub fn failing(times: usize) -> Self {
        let client = Self::new();
        client.fail_budget.store(times, Ordering::SeqCst);
        client
    }

    /// Total upsert calls observed, failed ones included.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<TaskDocument> {
        self.docs.get(&id).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Default for InMemoryIndexClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexClient for InMemoryIndexClient {
    async fn upsert(&self, id: i64, doc: &TaskDocument) -> Result<(), IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let burned = self
            .fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if burned.is_ok() {
            return Err(IndexError::Backend("simulated index outage".to_string()));
        }

        self.docs.insert(id, doc.clone());
        Ok(())
    }
}
