// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Mutation channel: the hand-off between the write path and the sync worker.
//!
//! A bounded FIFO of [`Task`] mutations with any number of producers and a
//! single consumer. Senders block when the channel is full (backpressure);
//! callers that must not block use [`MutationSender::try_send`]. The channel
//! closes once every sender has been dropped, at which point a blocked
//! receiver wakes and observes `None`.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::task::Task;

/// Failure to hand a mutation to the channel. Both variants return the
/// mutation so the caller can decide what to do with it.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("mutation channel is full")]
    Full(Task),
    #[error("mutation channel is closed")]
    Closed(Task),
}

/// Producer half of the mutation channel. Cheap to clone; one clone per
/// write-path handle.
#[derive(Clone)]
pub struct MutationSender {
    tx: mpsc::Sender<Task>,
}

/// Consumer half of the mutation channel. Held exclusively by the sync worker.
pub struct MutationReceiver {
    rx: mpsc::Receiver<Task>,
}

/// Create a bounded mutation channel.
#[must_use]
pub fn mutation_channel(capacity: usize) -> (MutationSender, MutationReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (MutationSender { tx }, MutationReceiver { rx })
}

impl MutationSender {
    /// Enqueue a mutation, waiting for capacity if the channel is full.
    ///
    /// Fails only when the channel is closed (the pipeline has shut down).
    pub async fn send(&self, task: Task) -> Result<(), ChannelError> {
        self.tx
            .send(task)
            .await
            .map_err(|mpsc::error::SendError(task)| ChannelError::Closed(task))
    }

    /// Enqueue a mutation without blocking.
    ///
    /// Returns [`ChannelError::Full`] when the channel is at capacity, for
    /// write paths that prefer dropping the sync signal over stalling.
    pub fn try_send(&self, task: Task) -> Result<(), ChannelError> {
        self.tx.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(task) => ChannelError::Full(task),
            mpsc::error::TrySendError::Closed(task) => ChannelError::Closed(task),
        })
    }

    /// Whether the consumer side is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl MutationReceiver {
    /// Receive the next mutation, waiting until one is available.
    ///
    /// Returns `None` once the channel is closed and drained. Closure is
    /// terminal: every subsequent call also returns `None`.
    pub async fn recv(&mut self) -> Option<Task> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn test_task(id: i64) -> Task {
        let mut task = Task::new(format!("task-{}", id), "", TaskStatus::Todo).unwrap();
        task.id = id;
        task
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = mutation_channel(8);

        for id in 1..=3 {
            tx.send(test_task(id)).await.unwrap();
        }

        assert_eq!(rx.recv().await.unwrap().id, 1);
        assert_eq!(rx.recv().await.unwrap().id, 2);
        assert_eq!(rx.recv().await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_try_send_full() {
        let (tx, _rx) = mutation_channel(1);

        tx.try_send(test_task(1)).unwrap();
        let err = tx.try_send(test_task(2)).unwrap_err();
        assert!(matches!(err, ChannelError::Full(task) if task.id == 2));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (tx, rx) = mutation_channel(1);
        drop(rx);

        assert!(tx.is_closed());
        let err = tx.send(test_task(1)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed(task) if task.id == 1));
    }

    #[tokio::test]
    async fn test_close_drains_then_none() {
        let (tx, mut rx) = mutation_channel(8);

        tx.send(test_task(1)).await.unwrap();
        tx.send(test_task(2)).await.unwrap();
        drop(tx);

        // Buffered mutations still drain after close
        assert_eq!(rx.recv().await.unwrap().id, 1);
        assert_eq!(rx.recv().await.unwrap().id, 2);
        // Closure is terminal
        assert!(rx.recv().await.is_none());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_blocked_recv_wakes_on_close() {
        let (tx, mut rx) = mutation_channel(8);

        let handle = tokio::spawn(async move { rx.recv().await });
        drop(tx);

        assert!(handle.await.unwrap().is_none());
    }
}
