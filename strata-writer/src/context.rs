//! State shared by every worker of a writer pool.

use std::sync::Arc;

use geo::{Coord, GeometryCollection, MultiLineString, MultiPolygon};
use strata_core::{
    Clipper, DiagnosticEvent, Diagnostics, ElementKind, ExpiredTiles, GeoBuilderFactory, Geometry,
    GeometryError, GeometryFactory, MaterializedLines, Match, OsmId, Progress, RowInserter,
};

/// Shared collaborators for writer workers.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct WriterContext {
    inserter: Arc<dyn RowInserter>,
    diagnostics: Arc<dyn Diagnostics>,
    factory: Arc<dyn GeometryFactory>,
    limiter: Option<Arc<dyn Clipper>>,
    expired: Option<Arc<ExpiredTiles>>,
    progress: Arc<Progress>,
    materialized: Arc<MaterializedLines>,
}

impl WriterContext {
    /// Context inserting into `inserter` and reporting to `diagnostics`.
    ///
    /// Geometries are built with [`GeoBuilderFactory`], nothing is clipped
    /// and no tiles are tracked until configured otherwise.
    pub fn new(inserter: Arc<dyn RowInserter>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            inserter,
            diagnostics,
            factory: Arc::new(GeoBuilderFactory),
            limiter: None,
            expired: None,
            progress: Arc::new(Progress::default()),
            materialized: Arc::new(MaterializedLines::default()),
        }
    }

    /// Use `factory` for per-worker builders.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn GeometryFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Clip geometries with `limiter` before inserting.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<dyn Clipper>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Mark tiles touched by written elements.
    #[must_use]
    pub fn with_expired_tiles(mut self, expired: Arc<ExpiredTiles>) -> Self {
        self.expired = Some(expired);
        self
    }

    /// Count processed elements in `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Share `materialized` between relation and way writers.
    #[must_use]
    pub fn with_materialized(mut self, materialized: Arc<MaterializedLines>) -> Self {
        self.materialized = materialized;
        self
    }

    /// Progress counters updated by the workers.
    #[must_use]
    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    /// Ways already represented by relation rows.
    #[must_use]
    pub fn materialized(&self) -> &Arc<MaterializedLines> {
        &self.materialized
    }

    pub(crate) fn factory(&self) -> &Arc<dyn GeometryFactory> {
        &self.factory
    }

    pub(crate) fn expire(&self, coords: &[Coord<f64>]) {
        if let Some(expired) = &self.expired {
            expired.expire_from_coords(coords);
        }
    }

    /// Report a build failure unless its severity marks it as expected.
    pub(crate) fn build_failed(&self, kind: ElementKind, id: OsmId, error: GeometryError) {
        if error.is_reportable() {
            self.diagnostics
                .report(DiagnosticEvent::GeometryFailed { kind, id, error });
        } else {
            log::debug!("dropping {kind} {id}: {error}");
        }
    }

    /// Clip `geometry` and insert it once per match.
    ///
    /// Returns whether at least one row was inserted.
    pub(crate) fn clip_and_insert(
        &self,
        kind: ElementKind,
        id: OsmId,
        geometry: Geometry,
        matches: &[Match],
    ) -> bool {
        let Some(geometry) = self.clip(kind, id, geometry) else {
            return false;
        };
        let mut inserted = false;
        for Match { table, .. } in matches {
            match self.inserter.insert_row(table, id, &geometry) {
                Ok(()) => inserted = true,
                Err(error) => self
                    .diagnostics
                    .report(DiagnosticEvent::sink_failed(table, id, &error)),
            }
        }
        inserted
    }

    fn clip(&self, kind: ElementKind, id: OsmId, geometry: Geometry) -> Option<Geometry> {
        let Some(limiter) = &self.limiter else {
            return Some(geometry);
        };
        match limiter.clip(&geometry) {
            Ok(parts) => merge_parts(parts),
            Err(error) => {
                self.diagnostics
                    .report(DiagnosticEvent::ClipFailed { kind, id, error });
                None
            }
        }
    }
}

/// Combine clipped parts into the geometry of a single row.
fn merge_parts(mut parts: Vec<Geometry>) -> Option<Geometry> {
    if parts.len() <= 1 {
        return parts.pop();
    }
    if parts.iter().all(|part| matches!(part, Geometry::LineString(_))) {
        let lines = parts
            .into_iter()
            .filter_map(|part| match part {
                Geometry::LineString(line) => Some(line),
                _ => None,
            })
            .collect();
        return Some(Geometry::MultiLineString(MultiLineString::new(lines)));
    }
    if parts.iter().all(|part| matches!(part, Geometry::Polygon(_))) {
        let polygons = parts
            .into_iter()
            .filter_map(|part| match part {
                Geometry::Polygon(polygon) => Some(polygon),
                _ => None,
            })
            .collect();
        return Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)));
    }
    Some(Geometry::GeometryCollection(GeometryCollection(parts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point};
    use rstest::rstest;

    fn line(x: f64) -> Geometry {
        Geometry::LineString(LineString::from(vec![(x, 0.0), (x, 1.0)]))
    }

    #[rstest]
    fn no_parts_means_no_row() {
        assert_eq!(merge_parts(Vec::new()), None);
    }

    #[rstest]
    fn single_part_is_kept_as_is() {
        assert_eq!(merge_parts(vec![line(1.0)]), Some(line(1.0)));
    }

    #[rstest]
    fn line_parts_become_multi_line() {
        let merged = merge_parts(vec![line(1.0), line(2.0)]);
        assert!(matches!(merged, Some(Geometry::MultiLineString(ref m)) if m.0.len() == 2));
    }

    #[rstest]
    fn mixed_parts_become_collection() {
        let merged = merge_parts(vec![line(1.0), Geometry::Point(Point::new(0.0, 0.0))]);
        assert!(matches!(merged, Some(Geometry::GeometryCollection(ref c)) if c.0.len() == 2));
    }
}
