//! SQLite persistence for materialised rows.

use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, Error as SqliteError, OptionalExtension};
use strata_core::{Geometry, OsmId, RowDeleter, RowInserter, SinkError};
use thiserror::Error;

use crate::fs::ensure_parent_dir;

/// Errors raised by [`SqliteRowStore`].
#[derive(Debug, Error)]
pub enum SqliteRowStoreError {
    /// Failed to create the parent directory of the database file.
    #[error("failed to create parent directory for {path}")]
    CreateDirectory {
        /// Database path whose parent could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `materialized_rows` table failed.
    #[error("failed to create materialized_rows table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A statement failed.
    #[error("failed to {operation}")]
    Sqlite {
        /// What the statement was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A geometry could not be encoded or decoded as JSON.
    #[error("failed to convert geometry of row {id} in {table}")]
    Geometry {
        /// Target table.
        table: String,
        /// Row id.
        id: OsmId,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRow {
    /// Output table the row belongs to.
    pub table: String,
    /// Element id.
    pub id: OsmId,
    /// Stored geometry.
    pub geometry: Geometry,
}

/// Row store keeping every output table in one SQLite table.
///
/// Rows are keyed by `(table_name, osm_id)` and hold the geometry as JSON.
/// The connection sits behind a mutex so writer workers can share the store.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use strata_core::{RowDeleter, RowInserter};
/// use strata_data::SqliteRowStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteRowStore::in_memory()?;
/// let point = Geometry::Point(Point::new(1.0, 2.0));
/// store.insert_row("shop", 7, &point)?;
/// assert_eq!(store.row("shop", 7)?, Some(point));
///
/// store.delete_row("shop", 7)?;
/// assert_eq!(store.row("shop", 7)?, None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteRowStore {
    connection: Mutex<Connection>,
}

impl SqliteRowStore {
    /// Open or create the database at `path`, creating parent directories.
    ///
    /// # Errors
    /// Fails when the directory, the database or the schema cannot be created.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteRowStoreError> {
        ensure_parent_dir(path).map_err(|source| SqliteRowStoreError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteRowStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("opened row store at {path}");
        Self::initialise(connection)
    }

    /// Create a store backed by a private in-memory database.
    ///
    /// # Errors
    /// Fails when SQLite cannot allocate the database or its schema.
    pub fn in_memory() -> Result<Self, SqliteRowStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteRowStoreError::Open {
                path: Utf8PathBuf::from(":memory:"),
                source,
            })?;
        Self::initialise(connection)
    }

    fn initialise(connection: Connection) -> Result<Self, SqliteRowStoreError> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS materialized_rows (
                    table_name TEXT NOT NULL,
                    osm_id INTEGER NOT NULL,
                    geometry TEXT NOT NULL,
                    PRIMARY KEY (table_name, osm_id)
                )",
                [],
            )
            .map_err(|source| SqliteRowStoreError::CreateSchema { source })?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the row for `id` in `table`.
    ///
    /// # Errors
    /// Fails when the geometry cannot be encoded or the statement fails.
    pub fn insert(
        &self,
        table: &str,
        id: OsmId,
        geometry: &Geometry,
    ) -> Result<(), SqliteRowStoreError> {
        let encoded =
            serde_json::to_string(geometry).map_err(|source| SqliteRowStoreError::Geometry {
                table: table.to_owned(),
                id,
                source,
            })?;
        self.connection()
            .prepare_cached(
                "INSERT OR REPLACE INTO materialized_rows (table_name, osm_id, geometry)
                 VALUES (?1, ?2, ?3)",
            )
            .and_then(|mut statement| statement.execute((table, id, encoded)))
            .map(|_| ())
            .map_err(|source| SqliteRowStoreError::Sqlite {
                operation: "insert row",
                source,
            })
    }

    /// Delete the row for `id` in `table`, returning whether it existed.
    ///
    /// # Errors
    /// Fails when the statement fails.
    pub fn delete(&self, table: &str, id: OsmId) -> Result<bool, SqliteRowStoreError> {
        self.connection()
            .prepare_cached("DELETE FROM materialized_rows WHERE table_name = ?1 AND osm_id = ?2")
            .and_then(|mut statement| statement.execute((table, id)))
            .map(|changed| changed > 0)
            .map_err(|source| SqliteRowStoreError::Sqlite {
                operation: "delete row",
                source,
            })
    }

    /// Geometry stored for `id` in `table`.
    ///
    /// # Errors
    /// Fails when the query fails or the stored JSON is not a geometry.
    pub fn row(&self, table: &str, id: OsmId) -> Result<Option<Geometry>, SqliteRowStoreError> {
        let encoded: Option<String> = self
            .connection()
            .query_row(
                "SELECT geometry FROM materialized_rows WHERE table_name = ?1 AND osm_id = ?2",
                (table, id),
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| SqliteRowStoreError::Sqlite {
                operation: "select row",
                source,
            })?;
        encoded
            .map(|json| decode(table, id, &json))
            .transpose()
    }

    /// Every stored row ordered by table and id.
    ///
    /// # Errors
    /// Fails when the query fails or a stored geometry cannot be decoded.
    pub fn rows(&self) -> Result<Vec<MaterializedRow>, SqliteRowStoreError> {
        let select = |source: SqliteError| SqliteRowStoreError::Sqlite {
            operation: "select rows",
            source,
        };
        let connection = self.connection();
        let mut statement = connection
            .prepare(
                "SELECT table_name, osm_id, geometry FROM materialized_rows
                 ORDER BY table_name, osm_id",
            )
            .map_err(select)?;
        let raw = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, OsmId>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(select)?;
        raw.into_iter()
            .map(|(table, id, json)| {
                let geometry = decode(&table, id, &json)?;
                Ok(MaterializedRow {
                    table,
                    id,
                    geometry,
                })
            })
            .collect()
    }
}

fn decode(table: &str, id: OsmId, json: &str) -> Result<Geometry, SqliteRowStoreError> {
    serde_json::from_str(json).map_err(|source| SqliteRowStoreError::Geometry {
        table: table.to_owned(),
        id,
        source,
    })
}

impl RowDeleter for SqliteRowStore {
    fn delete_row(&self, table: &str, id: OsmId) -> Result<(), SinkError> {
        self.delete(table, id)
            .map(|_| ())
            .map_err(|source| SinkError::delete(table, id, source))
    }
}

impl RowInserter for SqliteRowStore {
    fn insert_row(&self, table: &str, id: OsmId, geometry: &Geometry) -> Result<(), SinkError> {
        self.insert(table, id, geometry)
            .map_err(|source| SinkError::insert(table, id, source))
    }
}
