//! Incremental diff application for Strata.
//!
//! Responsibilities:
//! - Remove rows invalidated by change records, cascading from nodes to the
//!   ways and relations built from them.
//! - Keep the element and dependency caches in step with the diff.
//! - Drive the writer pools over every element that needs rewriting.
//!
//! Boundaries:
//! - Reading diff files and persisting caches live in `strata-data`.
//!
//! Invariants:
//! - Records are applied strictly in order; every delete of a batch settles
//!   before any writer starts.

mod deleter;
mod update;

pub use deleter::Deleter;
pub use update::{UpdateContext, UpdateError, UpdateReport, apply_changes};
