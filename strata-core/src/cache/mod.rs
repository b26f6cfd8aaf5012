//! Element and dependency caches.
//!
//! The [`ElementCache`] trait is the read interface the deleter and the
//! update driver use to look up previously seen elements. The
//! [`DependencyCache`] records which ways and relations were built from
//! which children so that a single node edit can be traced to every row it
//! influenced.

use dashmap::DashSet;
use thiserror::Error;

use crate::element::{ElementKind, Member, Node, OsmId, Relation, Way};

mod dependency;
mod memory;

pub use dependency::{DependencyCache, DependencyIndex};
pub use memory::MemoryElementCache;

/// Errors returned by [`ElementCache`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The element is not present in the cache.
    #[error("{kind} {id} not found in cache")]
    NotFound {
        /// Kind of the missing element.
        kind: ElementKind,
        /// Identifier of the missing element.
        id: OsmId,
    },
    /// A way references a node whose coordinate is unknown.
    #[error("way {way} references node {node} without a cached coordinate")]
    MissingCoordinate {
        /// Way being hydrated.
        way: OsmId,
        /// Node without a coordinate.
        node: OsmId,
    },
    /// The backing store failed.
    #[error("cache backend failed for {kind} {id}: {message}")]
    Backend {
        /// Kind of the element being read.
        kind: ElementKind,
        /// Identifier of the element being read.
        id: OsmId,
        /// Backend-specific description.
        message: String,
    },
}

impl CacheError {
    /// Whether the error only signals absence.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read access to cached elements.
///
/// Lookups hand out owned copies; the cache keeps exclusive ownership of its
/// stored elements.
pub trait ElementCache {
    /// Look up a node.
    ///
    /// # Errors
    /// [`CacheError::NotFound`] when absent, any other variant on failure.
    fn node(&self, id: OsmId) -> Result<Node, CacheError>;

    /// Look up a way without coordinates.
    ///
    /// # Errors
    /// [`CacheError::NotFound`] when absent, any other variant on failure.
    fn way(&self, id: OsmId) -> Result<Way, CacheError>;

    /// Look up a relation without resolved members.
    ///
    /// # Errors
    /// [`CacheError::NotFound`] when absent, any other variant on failure.
    fn relation(&self, id: OsmId) -> Result<Relation, CacheError>;

    /// Fill `way.coords` from the cached node coordinates.
    ///
    /// # Errors
    /// Fails when any referenced node has no cached coordinate; `way.coords`
    /// is left untouched in that case.
    fn hydrate_way(&self, way: &mut Way) -> Result<(), CacheError>;

    /// Ways whose geometry is already represented by a relation row.
    fn materialized(&self) -> &MaterializedLines;

    /// Resolve and hydrate every way member of `relation`.
    ///
    /// # Errors
    /// Fails on the first member way that cannot be looked up or hydrated.
    fn hydrate_relation(&self, relation: &mut Relation) -> Result<(), CacheError> {
        for member in &mut relation.members {
            if member.kind != ElementKind::Way {
                continue;
            }
            let mut way = self.way(member.id)?;
            self.hydrate_way(&mut way)?;
            member.way = Some(way);
        }
        Ok(())
    }
}

/// Concurrent set of way ids already materialised as part of a relation.
///
/// Relation writers add to it from several workers at once, so it is backed
/// by a [`DashSet`].
#[derive(Debug, Default)]
pub struct MaterializedLines {
    ids: DashSet<OsmId>,
}

impl MaterializedLines {
    /// Record that a way is represented by a relation row.
    pub fn insert(&self, id: OsmId) {
        self.ids.insert(id);
    }

    /// Whether a way is represented by a relation row.
    #[must_use]
    pub fn contains(&self, id: OsmId) -> bool {
        self.ids.contains(&id)
    }

    /// Forget every way member of a relation.
    pub fn remove_members(&self, members: &[Member]) {
        for member in members {
            if member.kind == ElementKind::Way {
                self.ids.remove(&member.id);
            }
        }
    }

    /// Number of recorded ways.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no ways are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Recorded ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<OsmId> {
        let mut ids: Vec<_> = self.ids.iter().map(|entry| *entry).collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<OsmId> for MaterializedLines {
    fn from_iter<I: IntoIterator<Item = OsmId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
