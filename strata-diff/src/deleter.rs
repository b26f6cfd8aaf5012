//! Cascading removal of materialised rows for deleted or modified elements.

use strata_core::proj::{coords_to_merc, wgs84_to_merc};
use strata_core::{
    CacheError, ChangeRecord, DependencyCache, DiagnosticEvent, Diagnostics, Element,
    ElementCache, ElementKind, ExpiredTiles, Match, Matchers, OsmId, RowDeleter,
};

/// Removes stale rows for one change record at a time.
///
/// The deleter borrows the dependency cache mutably, so only one deleter can
/// edit edges at any moment. Records must be fed in diff order.
///
/// # Examples
/// ```
/// use strata_core::test_support::{RecordingDiagnostics, RecordingSink};
/// use strata_core::{
///     ChangeRecord, DependencyCache, MappingConfig, MemoryElementCache, Node,
/// };
/// use strata_diff::Deleter;
/// use geo::Coord;
///
/// # fn main() -> Result<(), strata_core::MappingError> {
/// let matchers = MappingConfig::from_json(
///     r#"{"tables":[{"name":"shop","geometry":"point","mapping":{"shop":["__any__"]}}]}"#,
/// )?
/// .matchers()?;
/// let node = Node::new(7, Coord { x: 1.0, y: 2.0 }).with_tags([("shop", "bakery")]);
/// let mut cache = MemoryElementCache::new();
/// cache.put_node(node.clone());
/// let mut deps = DependencyCache::default();
/// let sink = RecordingSink::new();
/// let diagnostics = RecordingDiagnostics::default();
///
/// Deleter::new(&cache, &mut deps, &sink, &matchers, &diagnostics)
///     .delete(&ChangeRecord::delete(node.into()));
/// assert_eq!(sink.deletes(), vec![("shop".to_owned(), 7)]);
/// # Ok(())
/// # }
/// ```
pub struct Deleter<'a> {
    cache: &'a dyn ElementCache,
    deps: &'a mut DependencyCache,
    sink: &'a dyn RowDeleter,
    matchers: &'a Matchers,
    diagnostics: &'a dyn Diagnostics,
    expired: Option<&'a ExpiredTiles>,
}

impl<'a> Deleter<'a> {
    /// Create a deleter without tile tracking.
    pub fn new(
        cache: &'a dyn ElementCache,
        deps: &'a mut DependencyCache,
        sink: &'a dyn RowDeleter,
        matchers: &'a Matchers,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            cache,
            deps,
            sink,
            matchers,
            diagnostics,
            expired: None,
        }
    }

    /// Mark tiles touched by deleted rows in `expired`.
    #[must_use]
    pub const fn with_expired_tiles(mut self, expired: &'a ExpiredTiles) -> Self {
        self.expired = Some(expired);
        self
    }

    /// Remove every row derived from the record's element.
    ///
    /// With `modify` set, rows of ways and relations built from the element
    /// are removed too, keeping their own dependency edges so they can be
    /// rebuilt. A node deleted without `add` loses its dependency entry.
    ///
    /// # Panics
    /// Panics when `record.delete` is false; callers must only pass deletes.
    pub fn delete(&mut self, record: &ChangeRecord) {
        assert!(
            record.delete,
            "delete called for {} {} without the delete flag",
            record.kind(),
            record.id()
        );

        match &record.element {
            Element::Relation(relation) => self.delete_relation(relation.id, true),
            Element::Way(way) => {
                self.delete_way(way.id, true);
                if record.modify {
                    for relation in self.deps.ways.dependents(way.id) {
                        self.delete_relation(relation, false);
                    }
                }
            }
            Element::Node(node) => {
                self.delete_node(node.id);
                if record.modify {
                    for way in self.deps.coords.dependents(node.id) {
                        self.delete_way(way, false);
                        for relation in self.deps.ways.dependents(way) {
                            self.delete_relation(relation, false);
                        }
                    }
                }
                if !record.add {
                    self.deps.coords.remove_all(node.id);
                }
            }
        }
    }

    fn delete_relation(&mut self, id: OsmId, remove_back_refs: bool) {
        let Some(relation) = self.lookup(ElementKind::Relation, id, self.cache.relation(id)) else {
            return;
        };
        let Some(tags) = relation.tags.as_ref() else {
            return;
        };
        let deleted = self.delete_rows(id, self.matchers.polygons.match_tags(tags));

        if deleted && remove_back_refs {
            for way in relation.way_member_ids() {
                self.deps.ways.remove(way, id);
            }
        }
        self.cache.materialized().remove_members(&relation.members);

        if let Some(expired) = self.expired.filter(|_| deleted) {
            for way_id in relation.way_member_ids() {
                let Ok(mut way) = self.cache.way(way_id) else {
                    continue;
                };
                if self.cache.hydrate_way(&mut way).is_err() {
                    continue;
                }
                coords_to_merc(&mut way.coords);
                expired.expire_from_coords(&way.coords);
            }
        }
    }

    fn delete_way(&mut self, id: OsmId, remove_back_refs: bool) {
        let Some(mut way) = self.lookup(ElementKind::Way, id, self.cache.way(id)) else {
            return;
        };
        let Some(tags) = way.tags.as_ref() else {
            return;
        };
        let mut matches = self.matchers.polygons.match_tags(tags);
        matches.extend(self.matchers.line_strings.match_tags(tags));
        let deleted = self.delete_rows(id, matches);

        if deleted && remove_back_refs {
            for node in &way.refs {
                self.deps.coords.remove(*node, id);
            }
        }

        if let Some(expired) = self.expired.filter(|_| deleted) {
            if let Err(error) = self.cache.hydrate_way(&mut way) {
                self.diagnostics.report(DiagnosticEvent::HydrationFailed {
                    kind: ElementKind::Way,
                    id,
                    error,
                });
                return;
            }
            coords_to_merc(&mut way.coords);
            expired.expire_from_coords(&way.coords);
        }
    }

    fn delete_node(&mut self, id: OsmId) {
        let Some(node) = self.lookup(ElementKind::Node, id, self.cache.node(id)) else {
            return;
        };
        let Some(tags) = node.tags.as_ref() else {
            return;
        };
        let deleted = self.delete_rows(id, self.matchers.points.match_tags(tags));

        if let Some(expired) = self.expired.filter(|_| deleted) {
            expired.expire_from_coords(&[wgs84_to_merc(node.coord)]);
        }
    }

    /// Delete the row for `id` in every matched table.
    ///
    /// Returns whether any match existed. A failing sink is reported but the
    /// row still counts, since its tags say it was materialised.
    fn delete_rows(&self, id: OsmId, matches: Vec<Match>) -> bool {
        let mut deleted = false;
        for Match { table, .. } in matches {
            if let Err(error) = self.sink.delete_row(&table, id) {
                self.diagnostics
                    .report(DiagnosticEvent::sink_failed(&table, id, &error));
            }
            deleted = true;
        }
        deleted
    }

    fn lookup<T>(&self, kind: ElementKind, id: OsmId, found: Result<T, CacheError>) -> Option<T> {
        match found {
            Ok(element) => Some(element),
            Err(error) if error.is_not_found() => None,
            Err(error) => {
                log::debug!("skipping delete of {kind} {id}");
                self.diagnostics
                    .report(DiagnosticEvent::LookupFailed { kind, id, error });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
