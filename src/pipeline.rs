// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Pipeline lifecycle.
//!
//! The [`SyncPipeline`] owns the mutation channel and the two background
//! tasks (sync worker, replay scheduler). It is constructed with its
//! collaborators injected, starts its tasks on spawn, and stops them through
//! an explicit shutdown signal; nothing here relies on process exit for
//! cleanup.
//!
//! # Lifecycle
//!
//! ```text
//! Running → ShuttingDown → Stopped
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use task_sync::{
//!     InMemoryDeadLetterStore, InMemoryIndexClient, PipelineState, SyncConfig, SyncPipeline,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pipeline = SyncPipeline::spawn(
//!     SyncConfig::default(),
//!     Arc::new(InMemoryIndexClient::new()),
//!     Arc::new(InMemoryDeadLetterStore::new()),
//! );
//! assert_eq!(pipeline.state(), PipelineState::Running);
//!
//! let sender = pipeline.sender();
//! // hand `sender` to the write path...
//!
//! drop(sender);
//! pipeline.shutdown().await;
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::channel::{mutation_channel, MutationSender};
use crate::config::SyncConfig;
use crate::index::IndexClient;
use crate::replay::ReplayScheduler;
use crate::storage::traits::DeadLetterStore;
use crate::worker::SyncWorker;

/// Pipeline lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Worker and scheduler tasks are running
    Running,
    /// Shutdown requested, draining
    ShuttingDown,
    /// Both tasks have exited
    Stopped,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Owner of the index-sync subsystem.
///
/// Holds the channel sender handed to the write path, the worker and
/// scheduler join handles, and the scheduler's shutdown signal.
pub struct SyncPipeline {
    sender: MutationSender,
    state: watch::Sender<PipelineState>,
    state_rx: watch::Receiver<PipelineState>,
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

impl SyncPipeline {
    /// Construct the channel and start both background tasks.
    #[tracing::instrument(skip_all)]
    pub fn spawn(
        config: SyncConfig,
        index: Arc<dyn IndexClient>,
        dead_letter: Arc<dyn DeadLetterStore>,
    ) -> Self {
        let (tx, rx) = mutation_channel(config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PipelineState::Running);

        let worker = SyncWorker::new(rx, index, dead_letter.clone(), &config);
        let scheduler = ReplayScheduler::new(dead_letter, tx.clone(), &config, shutdown_rx);

        info!("index sync pipeline started");
        Self {
            sender: tx,
            state: state_tx,
            state_rx,
            shutdown: shutdown_tx,
            worker: tokio::spawn(worker.run()),
            scheduler: tokio::spawn(scheduler.run()),
        }
    }

    /// Get a sender for the write path. Cheap to clone.
    #[must_use]
    pub fn sender(&self) -> MutationSender {
        self.sender.clone()
    }

    /// Get current pipeline state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<PipelineState> {
        self.state_rx.clone()
    }

    /// Initiate graceful shutdown and wait for both tasks to exit.
    ///
    /// Stops the replay scheduler, closes the mutation channel, and waits for
    /// the worker to drain whatever is still queued. The channel only closes
    /// once every [`MutationSender`] clone is gone, so callers must drop
    /// their senders before awaiting this.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(self) {
        info!("shutting down index sync pipeline");
        let _ = self.state.send(PipelineState::ShuttingDown);

        // Stop the scheduler first so it cannot re-enqueue into a draining
        // channel
        let _ = self.shutdown.send(true);
        if let Err(err) = self.scheduler.await {
            error!(error = %err, "replay scheduler task failed");
        }

        // Dropping our sender closes the channel once the write path's
        // clones are gone; the worker drains and exits
        drop(self.sender);
        if let Err(err) = self.worker.await {
            error!(error = %err, "sync worker task failed");
        }

        let _ = self.state.send(PipelineState::Stopped);
        info!("index sync pipeline stopped");
    }
}
