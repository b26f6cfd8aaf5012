//! Fixed-size worker pool over a bounded queue.

use std::sync::Arc;

use strata_core::{GeometryBuilder, GeometryFactory};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::error::WriterError;

/// Queue capacity used when callers have no preference.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Per-element work run inside a pool worker.
pub trait ProcessElement: Send + Sync + 'static {
    /// Element type pulled from the queue.
    type Element: Send + 'static;

    /// Process one element with the worker's own builder.
    ///
    /// Runs on a blocking thread, so implementations may build geometry and
    /// write to synchronous storage directly. Failures are reported and the
    /// element dropped; this never fails.
    fn process(&self, builder: &mut dyn GeometryBuilder, element: Self::Element);
}

/// A pool of blocking tokio tasks draining one shared queue.
///
/// Workers run on the runtime's blocking thread pool, share the receiving
/// end through a mutex and each creates its own [`GeometryBuilder`] on start. Dropping the sender in
/// [`WriterPool::finish`] lets them drain the queue and exit; the join set is
/// the completion barrier.
pub struct WriterPool<P: ProcessElement> {
    sender: mpsc::Sender<P::Element>,
    workers: JoinSet<()>,
}

impl<P: ProcessElement> WriterPool<P> {
    /// Start `workers` blocking tasks running `processor`.
    ///
    /// At least one worker is always started.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn spawn(
        processor: P,
        factory: &Arc<dyn GeometryFactory>,
        workers: usize,
        queue_depth: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let processor = Arc::new(processor);
        let mut set = JoinSet::new();
        for _ in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let processor = Arc::clone(&processor);
            let factory = Arc::clone(factory);
            set.spawn_blocking(move || {
                let mut builder = factory.new_builder();
                loop {
                    let next = receiver.blocking_lock().blocking_recv();
                    let Some(element) = next else {
                        break;
                    };
                    processor.process(builder.as_mut(), element);
                }
            });
        }
        log::debug!("started {} writer workers", set.len());
        Self {
            sender,
            workers: set,
        }
    }

    /// Queue one element, waiting while the queue is full.
    ///
    /// # Errors
    /// [`WriterError::QueueClosed`] when every worker has already exited.
    pub async fn send(&self, element: P::Element) -> Result<(), WriterError> {
        self.sender
            .send(element)
            .await
            .map_err(|_| WriterError::QueueClosed)
    }

    /// Close the queue and wait for every worker to drain it.
    ///
    /// # Errors
    /// [`WriterError::WorkerFailed`] for the first worker that panicked.
    pub async fn finish(self) -> Result<(), WriterError> {
        let Self {
            sender,
            mut workers,
        } = self;
        drop(sender);
        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                log::warn!("writer worker failed: {error}");
                failure.get_or_insert(WriterError::WorkerFailed(error));
            }
        }
        failure.map_or(Ok(()), Err)
    }
}
