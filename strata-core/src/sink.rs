//! Row-level storage capabilities.

use std::error::Error as StdError;

use thiserror::Error;

use crate::element::OsmId;
use crate::geom::Geometry;

/// Failure reported by a storage sink.
#[derive(Debug, Error)]
#[error("{operation} failed for row {id} in {table}")]
pub struct SinkError {
    /// `"delete"` or `"insert"`.
    pub operation: &'static str,
    /// Target table.
    pub table: String,
    /// Row id.
    pub id: OsmId,
    /// Backend error.
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl SinkError {
    /// Wrap a backend error for a delete.
    pub fn delete<E>(table: &str, id: OsmId, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            operation: "delete",
            table: table.to_owned(),
            id,
            source: source.into(),
        }
    }

    /// Wrap a backend error for an insert.
    pub fn insert<E>(table: &str, id: OsmId, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            operation: "insert",
            table: table.to_owned(),
            id,
            source: source.into(),
        }
    }
}

/// Removes materialised rows.
pub trait RowDeleter {
    /// Delete the row for `id` in `table`.
    ///
    /// Deleting a row that does not exist succeeds.
    ///
    /// # Errors
    /// Returns a [`SinkError`] when the backend fails.
    fn delete_row(&self, table: &str, id: OsmId) -> Result<(), SinkError>;
}

/// Stores materialised rows. Called concurrently by writer workers.
pub trait RowInserter: Send + Sync {
    /// Insert or replace the row for `id` in `table`.
    ///
    /// # Errors
    /// Returns a [`SinkError`] when the backend fails.
    fn insert_row(&self, table: &str, id: OsmId, geometry: &Geometry) -> Result<(), SinkError>;
}
