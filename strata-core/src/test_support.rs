//! Recording doubles for unit and behaviour tests.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::cache::{CacheError, ElementCache, MaterializedLines};
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::element::{ElementKind, Node, OsmId, Relation, Way};
use crate::geom::Geometry;
use crate::sink::{RowDeleter, RowInserter, SinkError};

/// Sink recording every delete and insert in call order.
///
/// Tables listed through [`RecordingSink::failing_on`] reject every call.
#[derive(Debug, Default)]
pub struct RecordingSink {
    deletes: Mutex<Vec<(String, OsmId)>>,
    inserts: Mutex<Vec<(String, OsmId, Geometry)>>,
    failing: HashSet<String>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call targeting `table` fail.
    #[must_use]
    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing.insert(table.to_owned());
        self
    }

    /// Recorded deletes.
    #[must_use]
    pub fn deletes(&self) -> Vec<(String, OsmId)> {
        self.deletes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Recorded inserts, sorted by table then id.
    #[must_use]
    pub fn inserts(&self) -> Vec<(String, OsmId, Geometry)> {
        let mut rows = self
            .inserts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        rows.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        rows
    }

    /// Recorded inserts as `(table, id)` pairs, sorted.
    #[must_use]
    pub fn inserted_keys(&self) -> Vec<(String, OsmId)> {
        self.inserts()
            .into_iter()
            .map(|(table, id, _)| (table, id))
            .collect()
    }
}

impl RowDeleter for RecordingSink {
    fn delete_row(&self, table: &str, id: OsmId) -> Result<(), SinkError> {
        if self.failing.contains(table) {
            return Err(SinkError::delete(table, id, "table is read-only"));
        }
        self.deletes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((table.to_owned(), id));
        Ok(())
    }
}

impl RowInserter for RecordingSink {
    fn insert_row(&self, table: &str, id: OsmId, geometry: &Geometry) -> Result<(), SinkError> {
        if self.failing.contains(table) {
            return Err(SinkError::insert(table, id, "table is read-only"));
        }
        self.inserts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((table.to_owned(), id, geometry.clone()));
        Ok(())
    }
}

/// Diagnostics sink capturing events for assertions.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    /// Captured events in report order.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Whether nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}

/// Cache wrapper whose lookups fail with a backend error for chosen elements.
#[derive(Debug)]
pub struct FaultyCache<C> {
    inner: C,
    broken: HashSet<(ElementKind, OsmId)>,
}

impl<C: ElementCache> FaultyCache<C> {
    /// Wrap `inner` without faults.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            broken: HashSet::new(),
        }
    }

    /// Make lookups of `kind` `id` fail.
    #[must_use]
    pub fn breaking(mut self, kind: ElementKind, id: OsmId) -> Self {
        self.broken.insert((kind, id));
        self
    }

    fn check(&self, kind: ElementKind, id: OsmId) -> Result<(), CacheError> {
        if self.broken.contains(&(kind, id)) {
            return Err(CacheError::Backend {
                kind,
                id,
                message: "injected fault".to_owned(),
            });
        }
        Ok(())
    }
}

impl<C: ElementCache> ElementCache for FaultyCache<C> {
    fn node(&self, id: OsmId) -> Result<Node, CacheError> {
        self.check(ElementKind::Node, id)?;
        self.inner.node(id)
    }

    fn way(&self, id: OsmId) -> Result<Way, CacheError> {
        self.check(ElementKind::Way, id)?;
        self.inner.way(id)
    }

    fn relation(&self, id: OsmId) -> Result<Relation, CacheError> {
        self.check(ElementKind::Relation, id)?;
        self.inner.relation(id)
    }

    fn hydrate_way(&self, way: &mut Way) -> Result<(), CacheError> {
        self.inner.hydrate_way(way)
    }

    fn materialized(&self) -> &MaterializedLines {
        self.inner.materialized()
    }
}
