//! JSON-lines change files.
//!
//! Each non-blank line holds one serialised [`ChangeRecord`], for example
//! `{"element":{"node":{"id":1,"coord":{"x":13.4,"y":52.5}}},"add":true}`.
//! Records are returned in file order, which is the order they must be
//! applied in.

use camino::{Utf8Path, Utf8PathBuf};
use strata_core::ChangeRecord;
use thiserror::Error;

use crate::fs;

/// Errors raised while reading a change file.
#[derive(Debug, Error)]
pub enum ChangeFileError {
    /// The file could not be read.
    #[error("failed to read change file {path}")]
    Read {
        /// Change file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A line did not hold a valid change record.
    #[error("invalid change record on line {line}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}

/// Read every change record from the file at `path`.
///
/// # Errors
/// [`ChangeFileError::Read`] when the file cannot be read and
/// [`ChangeFileError::Parse`] for the first malformed line.
pub fn read_change_records(path: &Utf8Path) -> Result<Vec<ChangeRecord>, ChangeFileError> {
    let input = fs::read_to_string(path).map_err(|source| ChangeFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_change_records(&input)?;
    log::debug!("read {} change records from {path}", records.len());
    Ok(records)
}

/// Parse change records from JSON-lines text, skipping blank lines.
///
/// # Examples
/// ```
/// use strata_data::parse_change_records;
///
/// let input = r#"
/// {"element":{"way":{"id":5,"refs":[1,2]}},"delete":true}
///
/// {"element":{"node":{"id":1,"coord":{"x":0.0,"y":0.0}}},"add":true}
/// "#;
/// let records = parse_change_records(input).expect("valid records");
/// assert_eq!(records.len(), 2);
/// assert!(records.first().is_some_and(|record| record.delete));
/// ```
///
/// # Errors
/// [`ChangeFileError::Parse`] naming the first malformed line.
pub fn parse_change_records(input: &str) -> Result<Vec<ChangeRecord>, ChangeFileError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| ChangeFileError::Parse {
                line: index + 1,
                source,
            })
        })
        .collect()
}
