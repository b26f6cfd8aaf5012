//! Reporting of recoverable per-element failures.
//!
//! Neither the deleter nor the writers abort on a bad element. They describe
//! what went wrong as a [`DiagnosticEvent`] and hand it to an injected
//! [`Diagnostics`] sink, then move on to the next element.

use std::fmt;

use crate::cache::CacheError;
use crate::element::{ElementKind, OsmId};
use crate::geom::{ClipError, GeometryError};
use crate::sink::SinkError;

/// A recoverable failure while processing one element.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// A cache lookup failed for a reason other than absence.
    LookupFailed {
        /// Element being looked up.
        kind: ElementKind,
        /// Element id.
        id: OsmId,
        /// Underlying error.
        error: CacheError,
    },
    /// Coordinates for a way or relation could not be resolved.
    HydrationFailed {
        /// Element being hydrated.
        kind: ElementKind,
        /// Element id.
        id: OsmId,
        /// Underlying error.
        error: CacheError,
    },
    /// Geometry construction failed with a positive severity.
    GeometryFailed {
        /// Element being built.
        kind: ElementKind,
        /// Element id.
        id: OsmId,
        /// Underlying error.
        error: GeometryError,
    },
    /// The area limiter rejected a geometry.
    ClipFailed {
        /// Element being clipped.
        kind: ElementKind,
        /// Element id.
        id: OsmId,
        /// Underlying error.
        error: ClipError,
    },
    /// The storage sink failed to delete or insert a row.
    SinkFailed {
        /// Target table.
        table: String,
        /// Row id.
        id: OsmId,
        /// Rendered sink error.
        message: String,
    },
}

impl DiagnosticEvent {
    /// Build a [`DiagnosticEvent::SinkFailed`] from a sink error.
    #[must_use]
    pub fn sink_failed(table: &str, id: OsmId, error: &SinkError) -> Self {
        Self::SinkFailed {
            table: table.to_owned(),
            id,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookupFailed { kind, id, error } => {
                write!(f, "lookup of {kind} {id} failed: {error}")
            }
            Self::HydrationFailed { kind, id, error } => {
                write!(f, "hydrating {kind} {id} failed: {error}")
            }
            Self::GeometryFailed { kind, id, error } => {
                write!(f, "building geometry for {kind} {id} failed: {error}")
            }
            Self::ClipFailed { kind, id, error } => {
                write!(f, "clipping {kind} {id} failed: {error}")
            }
            Self::SinkFailed { table, id, message } => {
                write!(f, "row {id} in {table}: {message}")
            }
        }
    }
}

/// Receives recoverable failures.
///
/// Writers report from several workers at once.
pub trait Diagnostics: Send + Sync {
    /// Record one event.
    fn report(&self, event: DiagnosticEvent);
}

/// Forwards events to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, event: DiagnosticEvent) {
        log::warn!("{event}");
    }
}
