//! Reverse-reference index from children to the parents built from them.
//!
//! Only edges observed while applying diffs are recorded; the index is not a
//! complete picture of the upstream dataset. Mutation happens from
//! sequential code only.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::{OsmId, Relation, Way};

/// Child id → set of parent ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DependencyIndex {
    edges: BTreeMap<OsmId, BTreeSet<OsmId>>,
}

impl DependencyIndex {
    /// Parents depending on `child`, in ascending order.
    #[must_use]
    pub fn dependents(&self, child: OsmId) -> Vec<OsmId> {
        self.edges
            .get(&child)
            .map(|parents| parents.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Record that `parent` was built from `child`.
    ///
    /// Returns `false` when the edge already existed.
    pub fn add(&mut self, child: OsmId, parent: OsmId) -> bool {
        self.edges.entry(child).or_default().insert(parent)
    }

    /// Remove one edge, dropping the child's entry once it has no parents.
    ///
    /// Returns `false` when the edge was absent.
    pub fn remove(&mut self, child: OsmId, parent: OsmId) -> bool {
        let Some(parents) = self.edges.get_mut(&child) else {
            return false;
        };
        let removed = parents.remove(&parent);
        if parents.is_empty() {
            self.edges.remove(&child);
        }
        removed
    }

    /// Remove every edge leaving `child`.
    pub fn remove_all(&mut self, child: OsmId) -> Option<BTreeSet<OsmId>> {
        self.edges.remove(&child)
    }

    /// Whether the edge `child → parent` is present.
    #[must_use]
    pub fn contains(&self, child: OsmId, parent: OsmId) -> bool {
        self.edges
            .get(&child)
            .is_some_and(|parents| parents.contains(&parent))
    }

    /// Number of children with at least one parent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the index holds no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}

/// Node → way and way → relation indices.
///
/// # Examples
/// ```
/// use strata_core::{DependencyCache, Way};
///
/// let mut deps = DependencyCache::default();
/// deps.add_from_way(&Way::new(10, vec![1, 2, 3]));
/// assert_eq!(deps.coords.dependents(2), vec![10]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DependencyCache {
    /// Node id → ways referencing it.
    pub coords: DependencyIndex,
    /// Way id → relations referencing it.
    pub ways: DependencyIndex,
}

impl DependencyCache {
    /// Record an edge from every referenced node to `way`.
    pub fn add_from_way(&mut self, way: &Way) {
        for node in &way.refs {
            self.coords.add(*node, way.id);
        }
    }

    /// Record an edge from every way member to `relation`.
    pub fn add_from_relation(&mut self, relation: &Relation) {
        for way in relation.way_member_ids() {
            self.ways.add(way, relation.id);
        }
    }
}
