//! Storage and file adapters for the Strata update engine.
//!
//! Responsibilities:
//! - Persist materialised rows in SQLite behind the core sink traits.
//! - Read JSON-lines change files into change records.
//! - Save and restore the element and dependency caches between runs.
//!
//! Boundaries:
//! - Do not encode cascade or writer rules (live in `strata-diff` and
//!   `strata-writer`).
//! - File access goes through `cap-std` with UTF-8 paths.
//!
//! Invariants:
//! - The row store is safe to share between writer workers.
//! - No global mutable state.
#![forbid(unsafe_code)]

mod changes;
pub mod fs;
mod state;
mod store;

pub use changes::{ChangeFileError, parse_change_records, read_change_records};
pub use state::{CacheState, CacheStateError};
pub use store::{MaterializedRow, SqliteRowStore, SqliteRowStoreError};
