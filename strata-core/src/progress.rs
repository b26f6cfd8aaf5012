//! Processed-element counters shared by writer workers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::ElementKind;

/// Atomic counts of elements taken from writer queues.
///
/// # Examples
/// ```
/// use strata_core::{ElementKind, Progress};
///
/// let progress = Progress::default();
/// progress.record(ElementKind::Way);
/// assert_eq!(progress.snapshot().ways, 1);
/// ```
#[derive(Debug, Default)]
pub struct Progress {
    nodes: AtomicU64,
    ways: AtomicU64,
    relations: AtomicU64,
}

/// A point-in-time copy of [`Progress`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Nodes processed.
    pub nodes: u64,
    /// Ways processed.
    pub ways: u64,
    /// Relations processed.
    pub relations: u64,
}

impl Progress {
    /// Count one processed element of `kind`.
    pub fn record(&self, kind: ElementKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    /// Elements of `kind` processed so far.
    #[must_use]
    pub fn count(&self, kind: ElementKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    /// Copy all counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            nodes: self.count(ElementKind::Node),
            ways: self.count(ElementKind::Way),
            relations: self.count(ElementKind::Relation),
        }
    }

    const fn counter(&self, kind: ElementKind) -> &AtomicU64 {
        match kind {
            ElementKind::Node => &self.nodes,
            ElementKind::Way => &self.ways,
            ElementKind::Relation => &self.relations,
        }
    }
}
