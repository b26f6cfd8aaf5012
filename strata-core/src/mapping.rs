//! Tag classification against output-table rules.
//!
//! A [`TagMatcher`] maps a tag set onto zero or more output tables. One
//! matcher exists per [`GeometryClass`]; [`MappingConfig::matchers`] compiles
//! a declarative table list into the three matchers used by the deleter and
//! the writers.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::Tags;

/// Value placeholder accepting any tag value.
pub const ANY_VALUE: &str = "__any__";

/// Geometry produced for rows of an output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GeometryClass {
    /// Point rows built from nodes.
    Point,
    /// Linear rows built from ways.
    #[cfg_attr(feature = "serde", serde(rename = "linestring"))]
    LineString,
    /// Area rows built from closed ways or relations.
    Polygon,
}

impl fmt::Display for GeometryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Point => "point",
            Self::LineString => "linestring",
            Self::Polygon => "polygon",
        };
        f.write_str(label)
    }
}

/// A single classification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Output table receiving the row.
    pub table: String,
    /// Geometry class of that table.
    pub geometry: GeometryClass,
}

/// Classifies tags into output-table matches.
///
/// Implementations must be pure: the same tags always produce the same
/// matches. The deleter relies on this to reconstruct whether a row was ever
/// written.
///
/// # Examples
///
/// ```rust
/// use strata_core::{GeometryClass, Match, TagMatcher, Tags};
///
/// struct Shops;
///
/// impl TagMatcher for Shops {
///     fn match_tags(&self, tags: &Tags) -> Vec<Match> {
///         tags.contains_key("shop")
///             .then(|| Match { table: "shop".into(), geometry: GeometryClass::Point })
///             .into_iter()
///             .collect()
///     }
/// }
///
/// let tags = Tags::from([("shop".into(), "bakery".into())]);
/// assert_eq!(Shops.match_tags(&tags).len(), 1);
/// ```
pub trait TagMatcher: Send + Sync {
    /// Return every table whose rules accept `tags`.
    fn match_tags(&self, tags: &Tags) -> Vec<Match>;
}

/// The three per-class matchers.
#[derive(Clone)]
pub struct Matchers {
    /// Matcher for point tables.
    pub points: Arc<dyn TagMatcher>,
    /// Matcher for line-string tables.
    pub line_strings: Arc<dyn TagMatcher>,
    /// Matcher for polygon tables.
    pub polygons: Arc<dyn TagMatcher>,
}

impl fmt::Debug for Matchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matchers").finish_non_exhaustive()
    }
}

/// Accepted values for one tag key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueFilter {
    Any,
    Values(BTreeSet<String>),
}

impl ValueFilter {
    fn from_values(values: &[String]) -> Self {
        if values.iter().any(|value| value == ANY_VALUE) {
            Self::Any
        } else {
            Self::Values(values.iter().cloned().collect())
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Values(values) => values.contains(value),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledTable {
    name: String,
    keys: BTreeMap<String, ValueFilter>,
}

impl CompiledTable {
    fn accepts(&self, tags: &Tags) -> bool {
        tags.iter().any(|(key, value)| {
            self.keys
                .get(key)
                .is_some_and(|filter| filter.accepts(value))
        })
    }
}

/// Rule-based matcher for a single geometry class.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    geometry: GeometryClass,
    tables: Vec<CompiledTable>,
}

impl RuleMatcher {
    /// A matcher that never matches.
    #[must_use]
    pub const fn empty(geometry: GeometryClass) -> Self {
        Self {
            geometry,
            tables: Vec::new(),
        }
    }

    /// Geometry class served by this matcher.
    #[must_use]
    pub const fn geometry(&self) -> GeometryClass {
        self.geometry
    }

    /// Number of tables this matcher classifies into.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl TagMatcher for RuleMatcher {
    fn match_tags(&self, tags: &Tags) -> Vec<Match> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.tables
            .iter()
            .filter(|table| table.accepts(tags))
            .map(|table| Match {
                table: table.name.clone(),
                geometry: self.geometry,
            })
            .collect()
    }
}

/// Declarative definition of one output table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TableConfig {
    /// Table name.
    pub name: String,
    /// Geometry class of the table.
    pub geometry: GeometryClass,
    /// Accepted tag keys and values; use [`ANY_VALUE`] to accept any value.
    pub mapping: BTreeMap<String, Vec<String>>,
}

/// Declarative list of output tables.
///
/// # Examples
/// ```
/// use strata_core::{MappingConfig, TagMatcher, Tags};
///
/// # fn main() -> Result<(), strata_core::MappingError> {
/// let config = MappingConfig::from_json(
///     r#"{"tables":[{"name":"landuse","geometry":"polygon","mapping":{"landuse":["__any__"]}}]}"#,
/// )?;
/// let matchers = config.matchers()?;
/// let tags = Tags::from([("landuse".into(), "forest".into())]);
/// assert_eq!(matchers.polygons.match_tags(&tags).len(), 1);
/// assert!(matchers.points.match_tags(&tags).is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MappingConfig {
    /// Output tables in declaration order.
    pub tables: Vec<TableConfig>,
}

/// Errors raised while compiling a [`MappingConfig`].
#[derive(Debug, Error)]
pub enum MappingError {
    /// Two tables share a name.
    #[error("table {name:?} is defined more than once")]
    DuplicateTable {
        /// Repeated table name.
        name: String,
    },
    /// A table accepts no tags at all.
    #[error("table {name:?} does not map any tag keys")]
    EmptyTable {
        /// Offending table name.
        name: String,
    },
    /// The mapping document could not be decoded.
    #[cfg(feature = "serde")]
    #[error("failed to decode mapping: {0}")]
    Decode(#[from] serde_json::Error),
}

impl MappingConfig {
    /// Decode a mapping from its JSON representation.
    ///
    /// # Errors
    /// Returns [`MappingError::Decode`] when the document is malformed.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile the tables into per-class matchers.
    ///
    /// # Errors
    /// Returns [`MappingError`] when table names repeat or a table maps no
    /// keys.
    pub fn matchers(&self) -> Result<Matchers, MappingError> {
        let mut seen = HashSet::new();
        let mut points = RuleMatcher::empty(GeometryClass::Point);
        let mut line_strings = RuleMatcher::empty(GeometryClass::LineString);
        let mut polygons = RuleMatcher::empty(GeometryClass::Polygon);

        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(MappingError::DuplicateTable {
                    name: table.name.clone(),
                });
            }
            if table.mapping.is_empty() {
                return Err(MappingError::EmptyTable {
                    name: table.name.clone(),
                });
            }
            let compiled = CompiledTable {
                name: table.name.clone(),
                keys: table
                    .mapping
                    .iter()
                    .map(|(key, values)| (key.clone(), ValueFilter::from_values(values)))
                    .collect(),
            };
            let target = match table.geometry {
                GeometryClass::Point => &mut points,
                GeometryClass::LineString => &mut line_strings,
                GeometryClass::Polygon => &mut polygons,
            };
            target.tables.push(compiled);
        }

        Ok(Matchers {
            points: Arc::new(points),
            line_strings: Arc::new(line_strings),
            polygons: Arc::new(polygons),
        })
    }
}
