//! Core domain types and capabilities for the Strata diff engine.
//!
//! Responsibilities:
//! - Model OSM elements and the change records that edit them.
//! - Define the capabilities the deleter and the writers consume: tag
//!   matching, element and dependency caches, geometry construction and
//!   clipping, row sinks and diagnostics.
//! - Track expired map tiles and writer progress.
//!
//! Boundaries:
//! - No storage or file formats (live in `strata-data`).
//! - No orchestration of deletes or writes (live in `strata-diff` and
//!   `strata-writer`).
//!
//! Invariants:
//! - Shared trackers (`ExpiredTiles`, `MaterializedLines`, `Progress`) are
//!   safe to use from several workers at once.
//! - No global mutable state.

mod cache;
mod change;
mod diagnostics;
mod element;
mod expire;
mod geom;
mod mapping;
mod progress;
pub mod proj;
mod sink;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{
    CacheError, DependencyCache, DependencyIndex, ElementCache, MaterializedLines,
    MemoryElementCache,
};
pub use change::ChangeRecord;
pub use diagnostics::{DiagnosticEvent, Diagnostics, LogDiagnostics};
pub use element::{Element, ElementKind, Member, Node, OsmId, Relation, Tags, Way};
pub use expire::{DEFAULT_EXPIRE_ZOOM, ExpiredTiles, MAX_EXPIRE_ZOOM, TileCoord, write_tile_list};
pub use geom::{
    AreaLimiter, ClipError, Clipper, GeoBuilder, GeoBuilderFactory, Geometry, GeometryBuilder,
    GeometryError, GeometryErrorKind, GeometryFactory,
};
pub use mapping::{
    ANY_VALUE, GeometryClass, Match, MappingConfig, MappingError, Matchers, RuleMatcher,
    TableConfig, TagMatcher,
};
pub use progress::{Progress, ProgressSnapshot};
pub use sink::{RowDeleter, RowInserter, SinkError};
