//! Index client contract and the indexed projection of a task.
//!
//! The search engine is an external collaborator with exactly one operation
//! the pipeline cares about: insert-or-replace a document keyed by task id.
//! Repeating an upsert with the same id and document is safe.

pub mod http;
pub mod memory;

pub use http::HttpIndexClient;
pub use memory::InMemoryIndexClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::Task;

/// Index documents are written into this index unless configured otherwise.
pub const DEFAULT_INDEX_NAME: &str = "task-idx";

/// Failure of an index operation. The worker treats every variant as
/// retryable up to the attempt limit; the split between transport failures
/// and engine rejections exists so a stricter policy can be layered on later
/// without touching the worker.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index backend error: {0}")]
    Backend(String),
    #[error("index rejected document {id}: {reason}")]
    Rejected { id: i64, reason: String },
}

/// The indexed projection of a [`Task`].
///
/// The JSON shape is an external contract consumed by index-side readers and
/// must not change: `id`, `title`, `content`, `status`, `createdAt`,
/// `updatedAt`, with RFC 3339 timestamps and the status as its uppercase
/// string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskDocument {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            content: task.content.clone(),
            status: task.status.to_string(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Capability to insert-or-replace one document in the search index.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Upsert `doc` under `id`. One logical document per id; a repeat call
    /// with the same arguments overwrites rather than duplicates.
    async fn upsert(&self, id: i64, doc: &TaskDocument) -> Result<(), IndexError>;
}
