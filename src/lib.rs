//! Facade crate for the Strata incremental OSM update engine.
//!
//! This crate re-exports the element model, the cascading deleter, the
//! concurrent writers and the update driver. The SQLite row store and file
//! adapters are available behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use strata_core::{
    AreaLimiter, ChangeRecord, Clipper, DependencyCache, DiagnosticEvent, Diagnostics, Element,
    ElementCache, ElementKind, ExpiredTiles, GeoBuilderFactory, Geometry, GeometryBuilder,
    GeometryError, GeometryFactory, LogDiagnostics, MappingConfig, MappingError, Matchers,
    MemoryElementCache, Member, Node, OsmId, Progress, ProgressSnapshot, Relation, RowDeleter,
    RowInserter, SinkError, TagMatcher, TileCoord, Way, proj, write_tile_list,
};
pub use strata_diff::{Deleter, UpdateContext, UpdateError, UpdateReport, apply_changes};
pub use strata_writer::{
    NodeProcessor, RelationProcessor, WayProcessor, WriterContext, WriterError, WriterPool,
};

#[cfg(feature = "test-support")]
pub use strata_core::test_support;

#[cfg(feature = "store-sqlite")]
pub use strata_data::{
    CacheState, CacheStateError, ChangeFileError, SqliteRowStore, SqliteRowStoreError,
    read_change_records,
};
