//! Error types emitted by the Strata CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use strata_core::MappingError;
use strata_data::{CacheStateError, ChangeFileError, SqliteRowStoreError};
use strata_diff::UpdateError;
use thiserror::Error;

/// Errors emitted by the Strata CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist or is not a file.
    #[error("{field} path {path} does not exist or is not a file")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The `--limit-to` value is not a valid bounding box.
    #[error("invalid bounding box {value:?}: expected minlon,minlat,maxlon,maxlat")]
    InvalidBoundingBox { value: String },
    /// The `--expire-zoom` value is out of range.
    #[error("expire zoom {zoom} exceeds the maximum of {max}")]
    InvalidExpireZoom { zoom: u8, max: u8 },
    /// Reading the mapping file failed.
    #[error("failed to read mapping {path}: {source}")]
    ReadMapping {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The mapping file is invalid.
    #[error("invalid mapping {path}: {source}")]
    InvalidMapping {
        path: Utf8PathBuf,
        #[source]
        source: MappingError,
    },
    /// Loading or saving the cache state failed.
    #[error(transparent)]
    CacheState(#[from] CacheStateError),
    /// Reading the change file failed.
    #[error("failed to read changes from {path}: {source}")]
    Changes {
        path: Utf8PathBuf,
        #[source]
        source: ChangeFileError,
    },
    /// Opening the row database failed.
    #[error(transparent)]
    RowStore(#[from] SqliteRowStoreError),
    /// Starting the async runtime failed.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Applying the changes failed.
    #[error("failed to apply changes: {0}")]
    Update(#[from] UpdateError),
    /// Writing the expired tile list failed.
    #[error("failed to write expired tiles to {path}: {source}")]
    WriteExpiredTiles {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the run summary failed.
    #[error("failed to write summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}
