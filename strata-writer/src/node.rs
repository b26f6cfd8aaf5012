//! Point rows from tagged nodes.

use std::sync::Arc;

use strata_core::proj::wgs84_to_merc;
use strata_core::{ElementKind, GeometryBuilder, Node, TagMatcher};

use crate::context::WriterContext;
use crate::pool::{DEFAULT_QUEUE_DEPTH, ProcessElement, WriterPool};

/// Writes nodes matching point tables.
pub struct NodeProcessor {
    matcher: Arc<dyn TagMatcher>,
    context: WriterContext,
}

impl NodeProcessor {
    /// Classify with the point-table `matcher`.
    pub fn new(matcher: Arc<dyn TagMatcher>, context: WriterContext) -> Self {
        Self { matcher, context }
    }
}

impl ProcessElement for NodeProcessor {
    type Element = Node;

    fn process(&self, builder: &mut dyn GeometryBuilder, mut node: Node) {
        self.context.progress().record(ElementKind::Node);
        let matches = node
            .tags
            .as_ref()
            .map(|tags| self.matcher.match_tags(tags))
            .unwrap_or_default();
        if matches.is_empty() {
            return;
        }

        node.coord = wgs84_to_merc(node.coord);
        self.context.expire(&[node.coord]);

        let point = match builder.point(&node) {
            Ok(point) => point,
            Err(error) => {
                self.context.build_failed(ElementKind::Node, node.id, error);
                return;
            }
        };
        self.context
            .clip_and_insert(ElementKind::Node, node.id, point, &matches);
    }
}

impl WriterPool<NodeProcessor> {
    /// Start a node writer with `workers` tasks.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn nodes(matcher: Arc<dyn TagMatcher>, context: WriterContext, workers: usize) -> Self {
        let factory = Arc::clone(context.factory());
        Self::spawn(
            NodeProcessor::new(matcher, context),
            &factory,
            workers,
            DEFAULT_QUEUE_DEPTH,
        )
    }
}
