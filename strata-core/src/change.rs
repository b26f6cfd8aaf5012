//! Change records emitted by a diff reader.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind, Node, OsmId, Relation, Way};

/// One diff entry describing how a single element changes.
///
/// The payload always holds exactly one element. `delete` asks for the
/// element's materialised state to be removed; `modify` together with
/// `delete` means the old geometry is being replaced, which widens the
/// cascade to dependent ways and relations.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use strata_core::{ChangeRecord, Node};
///
/// let record = ChangeRecord::modify(Node::new(1, Coord { x: 0.0, y: 0.0 }).into());
/// assert!(record.delete && record.modify && record.add);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangeRecord {
    /// The element this record applies to.
    pub element: Element,
    /// The element's new state should be written.
    #[cfg_attr(feature = "serde", serde(default))]
    pub add: bool,
    /// The element replaces a previous version.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modify: bool,
    /// The element's previous materialised state must be removed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub delete: bool,
}

impl ChangeRecord {
    /// A record that only deletes the element.
    #[must_use]
    pub const fn delete(element: Element) -> Self {
        Self {
            element,
            add: false,
            modify: false,
            delete: true,
        }
    }

    /// A record that creates a new element.
    #[must_use]
    pub const fn create(element: Element) -> Self {
        Self {
            element,
            add: true,
            modify: false,
            delete: false,
        }
    }

    /// A record that replaces an existing element: delete, then re-add.
    #[must_use]
    pub const fn modify(element: Element) -> Self {
        Self {
            element,
            add: true,
            modify: true,
            delete: true,
        }
    }

    /// Identifier of the payload element.
    #[must_use]
    pub const fn id(&self) -> OsmId {
        self.element.id()
    }

    /// Kind of the payload element.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.element.kind()
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Way> for Element {
    fn from(way: Way) -> Self {
        Self::Way(way)
    }
}

impl From<Relation> for Element {
    fn from(relation: Relation) -> Self {
        Self::Relation(relation)
    }
}
