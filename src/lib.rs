//! # Task Sync
//!
//! Asynchronous search-index synchronization for the task service.
//!
//! Committed task mutations are handed to this subsystem through an in-process
//! channel and reflected, best-effort, into a search index. Transient index
//! failures are retried; mutations that exhaust their retries are persisted to
//! a durable dead-letter store and periodically replayed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   send    ┌──────────────────┐   upsert   ┌──────────────┐
//! │  Write path  │──────────▶│ Mutation Channel │───────────▶│ Index Client │
//! └──────────────┘           └──────────────────┘   (retry)  └──────────────┘
//!                                    ▲                              │
//!                                    │ re-enqueue        exhausted  │
//!                            ┌───────┴──────────┐   append  ┌───────▼──────┐
//!                            │ Replay Scheduler │◀──────────│ Dead-Letter  │
//!                            │  (30s interval)  │   scan    │    Store     │
//!                            └──────────────────┘           └──────────────┘
//! ```
//!
//! Delivery is at-least-once: a dead-letter entry is deleted after successful
//! re-enqueue, not after re-indexing, and upserts are idempotent by task id.
//! There is no ordering token across replayed and fresh mutations for the same
//! task; the index may transiently hold a stale value until the newest
//! mutation is processed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use task_sync::{
//!     HttpIndexClient, SqlDeadLetterStore, SyncConfig, SyncPipeline, Task, TaskStatus,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::default();
//!     let index = HttpIndexClient::connect("http://127.0.0.1:9200", &config.index_name).await?;
//!     let dead_letter = SqlDeadLetterStore::new("sqlite://dead_letter.db?mode=rwc").await?;
//!
//!     let pipeline = SyncPipeline::spawn(config, Arc::new(index), Arc::new(dead_letter));
//!     let sender = pipeline.sender();
//!
//!     // After each successful commit against the primary store:
//!     let task = Task::new("buy milk", "2 litres, semi-skimmed", TaskStatus::Todo)?;
//!     sender.send(task).await?;
//!
//!     drop(sender);
//!     pipeline.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: the [`SyncPipeline`] lifecycle owner
//! - [`channel`]: mutation hand-off between the write path and the worker
//! - [`worker`]: the sync worker loop (retry + dead-letter routing)
//! - [`replay`]: periodic dead-letter replay
//! - [`index`]: index client contract and implementations
//! - [`storage`]: dead-letter store contract and backends
//! - [`resilience`]: retry policy

pub mod channel;
pub mod config;
pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod replay;
pub mod resilience;
pub mod storage;
pub mod task;
pub mod worker;

pub use channel::{mutation_channel, ChannelError, MutationReceiver, MutationSender};
pub use config::{PoisonPolicy, SyncConfig};
pub use index::{
    HttpIndexClient, IndexClient, IndexError, InMemoryIndexClient, TaskDocument,
    DEFAULT_INDEX_NAME,
};
pub use pipeline::{PipelineState, SyncPipeline};
pub use replay::ReplayScheduler;
pub use resilience::retry::RetryConfig;
pub use storage::traits::{DeadLetterEntry, DeadLetterStore, StorageError};
pub use storage::{InMemoryDeadLetterStore, SqlDeadLetterStore};
pub use task::{Task, TaskError, TaskStatus};
pub use worker::SyncWorker;
