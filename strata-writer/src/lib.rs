//! Concurrent materialisation of OSM elements into output rows.
//!
//! Responsibilities:
//! - Run one fixed-size worker pool per element kind over a bounded queue.
//! - Classify, project, expire, build, clip and insert each element.
//!
//! Boundaries:
//! - Elements arrive hydrated; writers never consult the element or
//!   dependency caches.
//! - Per-element failures are reported through [`strata_core::Diagnostics`]
//!   and never stop a pool.
//!
//! Invariants:
//! - Each worker owns exactly one geometry builder for its whole life.
//! - A pool completes only once every worker has been joined.

mod context;
mod error;
mod node;
mod pool;
mod relation;
mod way;

pub use context::WriterContext;
pub use error::WriterError;
pub use node::NodeProcessor;
pub use pool::{DEFAULT_QUEUE_DEPTH, ProcessElement, WriterPool};
pub use relation::RelationProcessor;
pub use way::WayProcessor;
