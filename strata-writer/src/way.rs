//! Line and polygon rows from tagged ways.

use std::sync::Arc;

use strata_core::proj::coords_to_merc;
use strata_core::{ElementKind, GeometryBuilder, Matchers, TagMatcher, Way};

use crate::context::WriterContext;
use crate::pool::{DEFAULT_QUEUE_DEPTH, ProcessElement, WriterPool};

/// Writes hydrated ways matching line or polygon tables.
///
/// Ways already represented by a relation row are skipped. Polygon tables
/// only apply to closed ways. Lines and polygons are built and inserted
/// independently, so a broken ring still yields its line rows.
pub struct WayProcessor {
    line_strings: Arc<dyn TagMatcher>,
    polygons: Arc<dyn TagMatcher>,
    context: WriterContext,
}

impl WayProcessor {
    /// Classify with the line and polygon matchers of `matchers`.
    pub fn new(matchers: &Matchers, context: WriterContext) -> Self {
        Self {
            line_strings: Arc::clone(&matchers.line_strings),
            polygons: Arc::clone(&matchers.polygons),
            context,
        }
    }
}

impl ProcessElement for WayProcessor {
    type Element = Way;

    fn process(&self, builder: &mut dyn GeometryBuilder, mut way: Way) {
        self.context.progress().record(ElementKind::Way);
        if self.context.materialized().contains(way.id) {
            return;
        }
        let Some(tags) = way.tags.as_ref() else {
            return;
        };
        let lines = self.line_strings.match_tags(tags);
        let areas = if way.is_closed() {
            self.polygons.match_tags(tags)
        } else {
            Vec::new()
        };
        if lines.is_empty() && areas.is_empty() {
            return;
        }

        coords_to_merc(&mut way.coords);
        self.context.expire(&way.coords);

        if !lines.is_empty() {
            match builder.line_string(&way) {
                Ok(line) => {
                    self.context
                        .clip_and_insert(ElementKind::Way, way.id, line, &lines);
                }
                Err(error) => self.context.build_failed(ElementKind::Way, way.id, error),
            }
        }
        if !areas.is_empty() {
            match builder.polygon(&way) {
                Ok(area) => {
                    self.context
                        .clip_and_insert(ElementKind::Way, way.id, area, &areas);
                }
                Err(error) => self.context.build_failed(ElementKind::Way, way.id, error),
            }
        }
    }
}

impl WriterPool<WayProcessor> {
    /// Start a way writer with `workers` tasks.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn ways(matchers: &Matchers, context: WriterContext, workers: usize) -> Self {
        let factory = Arc::clone(context.factory());
        Self::spawn(
            WayProcessor::new(matchers, context),
            &factory,
            workers,
            DEFAULT_QUEUE_DEPTH,
        )
    }
}
