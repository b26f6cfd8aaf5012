//! Polygon rows from multipolygon relations.

use std::sync::Arc;

use strata_core::proj::coords_to_merc;
use strata_core::{ElementKind, GeometryBuilder, Relation, TagMatcher, Tags};

use crate::context::WriterContext;
use crate::pool::{DEFAULT_QUEUE_DEPTH, ProcessElement, WriterPool};

/// Writes relations with hydrated member ways matching polygon tables.
///
/// After a row is inserted, member ways that carry no tags of their own, or
/// exactly the relation's tags, are recorded as materialised so the way
/// writer does not emit them a second time.
pub struct RelationProcessor {
    matcher: Arc<dyn TagMatcher>,
    context: WriterContext,
}

impl RelationProcessor {
    /// Classify with the polygon-table `matcher`.
    pub fn new(matcher: Arc<dyn TagMatcher>, context: WriterContext) -> Self {
        Self { matcher, context }
    }

    fn mark_members(&self, relation: &Relation, tags: &Tags) {
        for member in &relation.members {
            let Some(way) = &member.way else {
                continue;
            };
            let redundant = way
                .tags
                .as_ref()
                .is_none_or(|own| own.is_empty() || own == tags);
            if redundant {
                self.context.materialized().insert(way.id);
            }
        }
    }
}

impl ProcessElement for RelationProcessor {
    type Element = Relation;

    fn process(&self, builder: &mut dyn GeometryBuilder, mut relation: Relation) {
        self.context.progress().record(ElementKind::Relation);
        let Some(tags) = relation.tags.clone() else {
            return;
        };
        let matches = self.matcher.match_tags(&tags);
        if matches.is_empty() {
            return;
        }

        for way in relation.members.iter_mut().filter_map(|m| m.way.as_mut()) {
            coords_to_merc(&mut way.coords);
            self.context.expire(&way.coords);
        }

        let area = match builder.relation_polygon(&relation) {
            Ok(area) => area,
            Err(error) => {
                self.context
                    .build_failed(ElementKind::Relation, relation.id, error);
                return;
            }
        };
        if self
            .context
            .clip_and_insert(ElementKind::Relation, relation.id, area, &matches)
        {
            self.mark_members(&relation, &tags);
        }
    }
}

impl WriterPool<RelationProcessor> {
    /// Start a relation writer with `workers` tasks.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn relations(matcher: Arc<dyn TagMatcher>, context: WriterContext, workers: usize) -> Self {
        let factory = Arc::clone(context.factory());
        Self::spawn(
            RelationProcessor::new(matcher, context),
            &factory,
            workers,
            DEFAULT_QUEUE_DEPTH,
        )
    }
}
