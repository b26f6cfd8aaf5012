//! OSM element model shared by the caches, the deleter and the writers.
//!
//! Coordinates are WGS84 with `x = longitude` and `y = latitude` until a
//! writer or the deleter reprojects them with [`crate::proj`].

use std::collections::HashMap;
use std::fmt;

use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of an element, unique within its kind.
pub type OsmId = i64;

/// Free-form OSM key/value tags.
pub type Tags = HashMap<String, String>;

/// Kind discriminator for elements and relation members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ElementKind {
    /// A single coordinate.
    Node,
    /// An ordered list of node references.
    Way,
    /// An ordered list of typed members.
    Relation,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        };
        f.write_str(label)
    }
}

/// A tagged point.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use strata_core::Node;
///
/// let node = Node::new(7, Coord { x: 13.4, y: 52.5 })
///     .with_tags([("shop", "bakery")]);
/// assert!(node.tags.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// Node identifier.
    pub id: OsmId,
    /// Tags, absent when the node carries none.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Option<Tags>,
    /// Position of the node.
    pub coord: Coord<f64>,
}

impl Node {
    /// Construct an untagged node.
    #[must_use]
    pub const fn new(id: OsmId, coord: Coord<f64>) -> Self {
        Self {
            id,
            tags: None,
            coord,
        }
    }

    /// Attach tags to the node.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(collect_tags(tags));
        self
    }
}

/// An ordered sequence of node references.
///
/// `coords` is empty until the way has been hydrated by an
/// [`crate::ElementCache`]; once hydrated it holds one coordinate per
/// reference.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Way {
    /// Way identifier.
    pub id: OsmId,
    /// Tags, absent when the way carries none.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Option<Tags>,
    /// Referenced node identifiers in drawing order.
    pub refs: Vec<OsmId>,
    /// Coordinates resolved for `refs`.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub coords: Vec<Coord<f64>>,
}

impl Way {
    /// Construct an untagged, unhydrated way.
    #[must_use]
    pub const fn new(id: OsmId, refs: Vec<OsmId>) -> Self {
        Self {
            id,
            tags: None,
            refs,
            coords: Vec::new(),
        }
    }

    /// Attach tags to the way.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(collect_tags(tags));
        self
    }

    /// Whether the first and last references point at the same node.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.refs.len() >= 4 && self.refs.first() == self.refs.last()
    }

    /// Whether every reference has a resolved coordinate.
    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        !self.refs.is_empty() && self.coords.len() == self.refs.len()
    }
}

/// A typed reference from a relation to another element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Member {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Identifier of the referenced element.
    pub id: OsmId,
    /// Role of the member, such as `outer` or `inner`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub role: String,
    /// Resolved way for way members, filled in during hydration.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub way: Option<Way>,
}

impl Member {
    /// Reference a way with the given role.
    #[must_use]
    pub fn way(id: OsmId, role: &str) -> Self {
        Self {
            kind: ElementKind::Way,
            id,
            role: role.to_owned(),
            way: None,
        }
    }

    /// Reference a node with the given role.
    #[must_use]
    pub fn node(id: OsmId, role: &str) -> Self {
        Self {
            kind: ElementKind::Node,
            id,
            role: role.to_owned(),
            way: None,
        }
    }
}

/// An ordered collection of members.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Relation {
    /// Relation identifier.
    pub id: OsmId,
    /// Tags, absent when the relation carries none.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Option<Tags>,
    /// Members in declaration order.
    pub members: Vec<Member>,
}

impl Relation {
    /// Construct an untagged relation.
    #[must_use]
    pub const fn new(id: OsmId, members: Vec<Member>) -> Self {
        Self {
            id,
            tags: None,
            members,
        }
    }

    /// Attach tags to the relation.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(collect_tags(tags));
        self
    }

    /// Identifiers of all way members.
    pub fn way_member_ids(&self) -> impl Iterator<Item = OsmId> + '_ {
        self.members
            .iter()
            .filter(|member| member.kind == ElementKind::Way)
            .map(|member| member.id)
    }
}

/// Any element an edit can touch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Element {
    /// A node payload.
    Node(Node),
    /// A way payload.
    Way(Way),
    /// A relation payload.
    Relation(Relation),
}

impl Element {
    /// Identifier of the wrapped element.
    #[must_use]
    pub const fn id(&self) -> OsmId {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Kind of the wrapped element.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Node(_) => ElementKind::Node,
            Self::Way(_) => ElementKind::Way,
            Self::Relation(_) => ElementKind::Relation,
        }
    }

    /// Tags of the wrapped element.
    #[must_use]
    pub const fn tags(&self) -> Option<&Tags> {
        match self {
            Self::Node(node) => node.tags.as_ref(),
            Self::Way(way) => way.tags.as_ref(),
            Self::Relation(relation) => relation.tags.as_ref(),
        }
    }
}

fn collect_tags<I, K, V>(tags: I) -> Tags
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    tags.into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![1, 2, 3, 1], true)]
    #[case(vec![1, 2, 3, 4], false)]
    #[case(vec![1, 2, 1], false)]
    #[case(vec![], false)]
    fn detects_closed_ways(#[case] refs: Vec<OsmId>, #[case] closed: bool) {
        assert_eq!(Way::new(1, refs).is_closed(), closed);
    }

    #[rstest]
    fn lists_only_way_members() {
        let relation = Relation::new(
            9,
            vec![Member::way(1, "outer"), Member::node(2, ""), Member::way(3, "inner")],
        );
        assert_eq!(relation.way_member_ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[rstest]
    fn element_reports_kind_and_id() {
        let element = Element::Way(Way::new(42, vec![1, 2]));
        assert_eq!(element.kind(), ElementKind::Way);
        assert_eq!(element.id(), 42);
        assert!(element.tags().is_none());
    }
}
