//! Error types for writer pools.

use thiserror::Error;
use tokio::task::JoinError;

/// Errors surfaced by a [`crate::WriterPool`].
#[derive(Debug, Error)]
pub enum WriterError {
    /// Every worker has exited, so the queue no longer accepts elements.
    #[error("writer queue is closed")]
    QueueClosed,
    /// A worker task panicked or was cancelled.
    #[error("writer worker failed")]
    WorkerFailed(#[source] JoinError),
}
