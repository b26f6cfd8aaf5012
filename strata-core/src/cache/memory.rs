//! In-memory [`ElementCache`] used by the update driver and tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::element::{ElementKind, Node, OsmId, Relation, Way};

use super::{CacheError, ElementCache, MaterializedLines};

/// Element cache keeping every element in hash maps.
#[derive(Debug, Default)]
pub struct MemoryElementCache {
    nodes: HashMap<OsmId, Node>,
    ways: HashMap<OsmId, Way>,
    relations: HashMap<OsmId, Relation>,
    materialized: Arc<MaterializedLines>,
}

impl MemoryElementCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a node.
    pub fn put_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Store or replace a way. Hydrated coordinates are not kept.
    pub fn put_way(&mut self, mut way: Way) {
        way.coords.clear();
        self.ways.insert(way.id, way);
    }

    /// Store or replace a relation. Resolved member ways are not kept.
    pub fn put_relation(&mut self, mut relation: Relation) {
        for member in &mut relation.members {
            member.way = None;
        }
        self.relations.insert(relation.id, relation);
    }

    /// Remove a node, returning it when present.
    pub fn remove_node(&mut self, id: OsmId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    /// Remove a way, returning it when present.
    pub fn remove_way(&mut self, id: OsmId) -> Option<Way> {
        self.ways.remove(&id)
    }

    /// Remove a relation, returning it when present.
    pub fn remove_relation(&mut self, id: OsmId) -> Option<Relation> {
        self.relations.remove(&id)
    }

    /// Shared handle to the materialised-line set for writer workers.
    #[must_use]
    pub fn shared_materialized(&self) -> Arc<MaterializedLines> {
        Arc::clone(&self.materialized)
    }

    /// Replace the materialised-line set, typically when restoring state.
    pub fn set_materialized(&mut self, lines: MaterializedLines) {
        self.materialized = Arc::new(lines);
    }

    /// Cached nodes in ascending id order.
    #[must_use]
    pub fn nodes(&self) -> Vec<&Node> {
        sorted_values(&self.nodes)
    }

    /// Cached ways in ascending id order.
    #[must_use]
    pub fn ways(&self) -> Vec<&Way> {
        sorted_values(&self.ways)
    }

    /// Cached relations in ascending id order.
    #[must_use]
    pub fn relations(&self) -> Vec<&Relation> {
        sorted_values(&self.relations)
    }
}

fn sorted_values<T>(map: &HashMap<OsmId, T>) -> Vec<&T> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_unstable_by_key(|(id, _)| **id);
    entries.into_iter().map(|(_, value)| value).collect()
}

impl ElementCache for MemoryElementCache {
    fn node(&self, id: OsmId) -> Result<Node, CacheError> {
        self.nodes.get(&id).cloned().ok_or(CacheError::NotFound {
            kind: ElementKind::Node,
            id,
        })
    }

    fn way(&self, id: OsmId) -> Result<Way, CacheError> {
        self.ways.get(&id).cloned().ok_or(CacheError::NotFound {
            kind: ElementKind::Way,
            id,
        })
    }

    fn relation(&self, id: OsmId) -> Result<Relation, CacheError> {
        self.relations
            .get(&id)
            .cloned()
            .ok_or(CacheError::NotFound {
                kind: ElementKind::Relation,
                id,
            })
    }

    fn hydrate_way(&self, way: &mut Way) -> Result<(), CacheError> {
        let coords = way
            .refs
            .iter()
            .map(|node_id| {
                self.nodes
                    .get(node_id)
                    .map(|node| node.coord)
                    .ok_or(CacheError::MissingCoordinate {
                        way: way.id,
                        node: *node_id,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        way.coords = coords;
        Ok(())
    }

    fn materialized(&self) -> &MaterializedLines {
        &self.materialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Member;
    use geo::Coord;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cache() -> MemoryElementCache {
        let mut cache = MemoryElementCache::new();
        cache.put_node(Node::new(1, Coord { x: 0.0, y: 0.0 }));
        cache.put_node(Node::new(2, Coord { x: 1.0, y: 0.0 }));
        cache.put_way(Way::new(10, vec![1, 2]));
        cache.put_way(Way::new(11, vec![1, 3]));
        cache.put_relation(Relation::new(
            20,
            vec![Member::way(10, "outer"), Member::node(1, "label")],
        ));
        cache
    }

    #[rstest]
    fn missing_elements_report_not_found(cache: MemoryElementCache) {
        let err = cache.way(99).expect_err("way 99 is absent");
        assert_eq!(
            err,
            CacheError::NotFound {
                kind: ElementKind::Way,
                id: 99
            }
        );
    }

    #[rstest]
    fn hydrates_way_coordinates(cache: MemoryElementCache) {
        let mut way = cache.way(10).expect("way 10 cached");
        cache.hydrate_way(&mut way).expect("hydrate way 10");
        assert_eq!(
            way.coords,
            vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }]
        );
        assert!(way.is_hydrated());
    }

    #[rstest]
    fn hydration_fails_on_missing_coordinate(cache: MemoryElementCache) {
        let mut way = cache.way(11).expect("way 11 cached");
        let err = cache.hydrate_way(&mut way).expect_err("node 3 is absent");
        assert_eq!(err, CacheError::MissingCoordinate { way: 11, node: 3 });
        assert!(way.coords.is_empty());
    }

    #[rstest]
    fn hydrates_relation_way_members(cache: MemoryElementCache) {
        let mut relation = cache.relation(20).expect("relation 20 cached");
        cache
            .hydrate_relation(&mut relation)
            .expect("hydrate relation 20");
        let outer = relation
            .members
            .first()
            .and_then(|member| member.way.as_ref())
            .expect("outer way resolved");
        assert_eq!(outer.coords.len(), 2);
    }

    #[rstest]
    fn stored_ways_drop_coordinates(mut cache: MemoryElementCache) {
        let mut way = Way::new(12, vec![1, 2]);
        way.coords = vec![Coord { x: 5.0, y: 5.0 }];
        cache.put_way(way);
        assert!(cache.way(12).expect("way 12 cached").coords.is_empty());
    }
}
