//! Expired-tile tracking for downstream cache invalidation.
//!
//! Coordinates fed to [`ExpiredTiles`] are Web Mercator metres (see
//! [`crate::proj`]). Every tile touched by a coordinate, or lying on the
//! segment between two consecutive coordinates, is recorded at the tracker's
//! zoom level. Coordinates close to a tile edge also expire the neighbouring
//! tile so that rendered labels and line caps crossing the edge are
//! refreshed.

use std::fmt;
use std::io::{self, Write};

use dashmap::DashSet;
use geo::Coord;

use crate::proj::MERC_MAX;

/// Default zoom level for expiry lists.
pub const DEFAULT_EXPIRE_ZOOM: u8 = 14;

/// Highest supported zoom level.
pub const MAX_EXPIRE_ZOOM: u8 = 24;

/// Fraction of a tile treated as the edge buffer.
const EDGE_BUFFER: f64 = 0.1;

/// Sampling step along segments, in tiles.
const SEGMENT_STEP: f64 = 0.5;

/// A tile address in the XYZ scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level.
    pub z: u8,
    /// Column, growing eastwards.
    pub x: u32,
    /// Row, growing southwards.
    pub y: u32,
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Concurrent accumulator of expired tiles.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use strata_core::{ExpiredTiles, TileCoord};
///
/// let tiles = ExpiredTiles::new(1);
/// tiles.expire_from_coords(&[Coord { x: -10_000_000.0, y: 10_000_000.0 }]);
/// assert_eq!(tiles.drain(), vec![TileCoord { z: 1, x: 0, y: 0 }]);
/// assert!(tiles.is_empty());
/// ```
#[derive(Debug)]
pub struct ExpiredTiles {
    zoom: u8,
    tiles: DashSet<TileCoord>,
}

impl ExpiredTiles {
    /// Create a tracker for the given zoom, capped at [`MAX_EXPIRE_ZOOM`].
    #[must_use]
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom: zoom.min(MAX_EXPIRE_ZOOM),
            tiles: DashSet::new(),
        }
    }

    /// Zoom level of recorded tiles.
    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Mark every tile touched by a point or a polyline.
    pub fn expire_from_coords(&self, coords: &[Coord<f64>]) {
        let mut previous: Option<Coord<f64>> = None;
        for coord in coords {
            if !coord.x.is_finite() || !coord.y.is_finite() {
                previous = None;
                continue;
            }
            let current = self.tile_position(*coord);
            if let Some(start) = previous {
                self.expire_segment(start, current);
            }
            self.expire_position(current);
            previous = Some(current);
        }
    }

    /// Remove and return the recorded tiles, sorted and deduplicated.
    ///
    /// Tiles marked concurrently with the drain are kept for the next one.
    #[must_use]
    pub fn drain(&self) -> Vec<TileCoord> {
        let mut drained: Vec<_> = self.tiles.iter().map(|tile| *tile).collect();
        for tile in &drained {
            self.tiles.remove(tile);
        }
        drained.sort_unstable();
        drained
    }

    /// Number of distinct tiles currently recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tiles are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn tiles_per_side(&self) -> f64 {
        f64::from(1_u32 << self.zoom)
    }

    /// Fractional tile position of a mercator coordinate, clamped to the grid.
    ///
    /// Clamping keeps segment sampling bounded by the grid size for
    /// coordinates outside the projection's range.
    fn tile_position(&self, coord: Coord<f64>) -> Coord<f64> {
        let n = self.tiles_per_side();
        Coord {
            x: ((coord.x + MERC_MAX) / (2.0 * MERC_MAX) * n).clamp(0.0, n),
            y: ((MERC_MAX - coord.y) / (2.0 * MERC_MAX) * n).clamp(0.0, n),
        }
    }

    fn expire_segment(&self, start: Coord<f64>, end: Coord<f64>) {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let length = dx.hypot(dy);
        if length <= SEGMENT_STEP {
            return;
        }
        let steps = (length / SEGMENT_STEP).ceil() as u32;
        for step in 1..steps {
            let t = f64::from(step) / f64::from(steps);
            self.expire_position(Coord {
                x: start.x + dx * t,
                y: start.y + dy * t,
            });
        }
    }

    fn expire_position(&self, position: Coord<f64>) {
        let max = self.tiles_per_side() - 1.0;
        let x = position.x.clamp(0.0, max);
        let y = position.y.clamp(0.0, max);
        let (tx, ty) = (x.floor(), y.floor());
        for nx in neighbours(x - tx, tx, max) {
            for ny in neighbours(y - ty, ty, max) {
                self.tiles.insert(TileCoord {
                    z: self.zoom,
                    x: nx as u32,
                    y: ny as u32,
                });
            }
        }
    }
}

/// The tile index itself plus the adjacent index when within the edge buffer.
fn neighbours(fraction: f64, index: f64, max: f64) -> Vec<f64> {
    let mut indices = vec![index];
    if fraction < EDGE_BUFFER && index > 0.0 {
        indices.push(index - 1.0);
    }
    if fraction > 1.0 - EDGE_BUFFER && index < max {
        indices.push(index + 1.0);
    }
    indices
}

/// Write tiles as `z/x/y` lines.
///
/// # Errors
/// Propagates failures from `writer`.
pub fn write_tile_list<W: Write>(tiles: &[TileCoord], mut writer: W) -> io::Result<()> {
    for tile in tiles {
        writeln!(writer, "{tile}")?;
    }
    writer.flush()
}
