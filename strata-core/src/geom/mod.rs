//! Geometry construction and clipping capabilities.
//!
//! The writers consume these traits; [`GeoBuilder`] and [`AreaLimiter`] are
//! the default implementations built on the `geo` crate.

use thiserror::Error;

use crate::element::{Node, OsmId, Relation, Way};

mod builder;
mod limiter;

pub use builder::{GeoBuilder, GeoBuilderFactory};
pub use limiter::AreaLimiter;

/// Geometry type exchanged between builders, clippers and sinks.
pub type Geometry = geo::Geometry<f64>;

/// Reason a geometry could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryErrorKind {
    /// Not enough coordinates for the requested shape.
    #[error("{count} coordinates are not enough for a {shape}")]
    TooFewPoints {
        /// Coordinates available.
        count: usize,
        /// Requested shape.
        shape: &'static str,
    },
    /// A polygon was requested from an open way.
    #[error("way is not closed")]
    NotClosed,
    /// A coordinate is NaN or infinite.
    #[error("coordinate is not finite")]
    InvalidCoordinate,
    /// A relation member way was not resolved before building.
    #[error("member way {way} is not resolved")]
    MissingMember {
        /// Unresolved way.
        way: OsmId,
    },
    /// Relation member ways could not be joined into closed rings.
    #[error("member ways do not form closed rings")]
    UnclosedRing,
    /// A relation has no usable way members.
    #[error("relation has no way members")]
    NoRings,
}

impl GeometryErrorKind {
    /// Default severity: degenerate shapes are expected in real data and
    /// rank at zero, broken input ranks above.
    #[must_use]
    pub const fn default_severity(&self) -> i32 {
        match self {
            Self::TooFewPoints { .. } | Self::NotClosed | Self::NoRings => 0,
            Self::InvalidCoordinate | Self::MissingMember { .. } | Self::UnclosedRing => 1,
        }
    }
}

/// Geometry construction failure carrying a severity.
///
/// A severity of zero or below marks an expected condition that callers drop
/// silently; positive severities are reported.
///
/// # Examples
/// ```
/// use strata_core::{GeometryError, GeometryErrorKind};
///
/// let error = GeometryError::new(GeometryErrorKind::NotClosed);
/// assert!(!error.is_reportable());
/// assert!(error.with_severity(2).is_reportable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (severity {severity})")]
pub struct GeometryError {
    /// What went wrong.
    pub kind: GeometryErrorKind,
    /// How much it matters.
    pub severity: i32,
}

impl GeometryError {
    /// Wrap `kind` with its default severity.
    #[must_use]
    pub const fn new(kind: GeometryErrorKind) -> Self {
        let severity = kind.default_severity();
        Self { kind, severity }
    }

    /// Override the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: i32) -> Self {
        self.severity = severity;
        self
    }

    /// Whether the failure should be reported rather than silently dropped.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        self.severity > 0
    }
}

impl From<GeometryErrorKind> for GeometryError {
    fn from(kind: GeometryErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Per-worker geometry construction context.
///
/// A builder may keep scratch state between calls and is never shared
/// between workers; each worker obtains its own from a [`GeometryFactory`].
pub trait GeometryBuilder: Send {
    /// Build a point from a projected node.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] when the node cannot form a point.
    fn point(&mut self, node: &Node) -> Result<Geometry, GeometryError>;

    /// Build a line string from a hydrated, projected way.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] when the way cannot form a line.
    fn line_string(&mut self, way: &Way) -> Result<Geometry, GeometryError>;

    /// Build a polygon from a closed, hydrated, projected way.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] when the way cannot form an area.
    fn polygon(&mut self, way: &Way) -> Result<Geometry, GeometryError>;

    /// Build a (multi)polygon from a relation with resolved, projected
    /// member ways.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] when the members cannot form an area.
    fn relation_polygon(&mut self, relation: &Relation) -> Result<Geometry, GeometryError>;
}

/// Creates one [`GeometryBuilder`] per worker.
pub trait GeometryFactory: Send + Sync {
    /// Create a fresh builder for exclusive use by one worker.
    fn new_builder(&self) -> Box<dyn GeometryBuilder>;
}

/// Clipping failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipError {
    /// The limiter cannot clip this geometry type.
    #[error("cannot clip {geometry} geometries")]
    Unsupported {
        /// Geometry type name.
        geometry: &'static str,
    },
    /// The geometry contains non-finite coordinates.
    #[error("geometry contains non-finite coordinates")]
    InvalidGeometry,
}

/// Restricts geometries to a coverage region.
pub trait Clipper: Send + Sync {
    /// Clip `geometry`, returning the parts inside the region.
    ///
    /// An empty result means the geometry lies completely outside.
    ///
    /// # Errors
    /// Returns a [`ClipError`] when the geometry cannot be clipped.
    fn clip(&self, geometry: &Geometry) -> Result<Vec<Geometry>, ClipError>;
}
