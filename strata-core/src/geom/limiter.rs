//! Clipping geometries to a coverage region.

use geo::{
    BooleanOps, BoundingRect, Coord, Intersects, MultiLineString, MultiPolygon, Point,
    Rect,
};

use crate::proj::wgs84_to_merc;

use super::{ClipError, Clipper, Geometry};

/// Clips geometries to a coverage multipolygon.
///
/// The region must use the same coordinate system as the geometries passed to
/// [`Clipper::clip`]; writers project to Web Mercator before clipping, so
/// [`AreaLimiter::from_wgs84_bbox`] projects its corners accordingly.
///
/// # Examples
/// ```
/// use geo::{Coord, LineString, Rect};
/// use strata_core::{AreaLimiter, Clipper, Geometry};
///
/// let limiter = AreaLimiter::new(
///     Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 }).to_polygon().into(),
/// );
/// let line = Geometry::LineString(LineString::from(vec![(-5.0, 5.0), (5.0, 5.0)]));
/// let parts = limiter.clip(&line).expect("clip line");
/// assert_eq!(parts.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AreaLimiter {
    region: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl AreaLimiter {
    /// Limit to `region`.
    #[must_use]
    pub fn new(region: MultiPolygon<f64>) -> Self {
        let bounds = region.bounding_rect();
        Self { region, bounds }
    }

    /// Limit to a longitude/latitude bounding box, projected to Web Mercator.
    #[must_use]
    pub fn from_wgs84_bbox(bbox: Rect<f64>) -> Self {
        let min = wgs84_to_merc(bbox.min());
        let max = wgs84_to_merc(bbox.max());
        Self::new(Rect::new(min, max).to_polygon().into())
    }

    /// The coverage region.
    #[must_use]
    pub const fn region(&self) -> &MultiPolygon<f64> {
        &self.region
    }

    fn misses_bounds(&self, geometry: &Geometry) -> bool {
        match (self.bounds, geometry.bounding_rect()) {
            (Some(bounds), Some(rect)) => !bounds.intersects(&rect),
            _ => true,
        }
    }

    fn clip_lines(&self, lines: &MultiLineString<f64>) -> Vec<Geometry> {
        self.region
            .clip(lines, false)
            .into_iter()
            .filter(|line| line.0.len() >= 2)
            .map(Geometry::LineString)
            .collect()
    }

    fn clip_areas(&self, areas: &MultiPolygon<f64>) -> Vec<Geometry> {
        areas
            .intersection(&self.region)
            .into_iter()
            .map(Geometry::Polygon)
            .collect()
    }
}

fn is_finite(geometry: &Geometry) -> bool {
    use geo::CoordsIter;
    geometry
        .coords_iter()
        .all(|Coord { x, y }| x.is_finite() && y.is_finite())
}

impl Clipper for AreaLimiter {
    fn clip(&self, geometry: &Geometry) -> Result<Vec<Geometry>, ClipError> {
        if !is_finite(geometry) {
            return Err(ClipError::InvalidGeometry);
        }
        if let Geometry::Point(point) = geometry {
            return Ok(clip_point(&self.region, *point));
        }
        if self.misses_bounds(geometry) {
            return Ok(Vec::new());
        }
        match geometry {
            Geometry::LineString(line) => {
                Ok(self.clip_lines(&MultiLineString::new(vec![line.clone()])))
            }
            Geometry::MultiLineString(lines) => Ok(self.clip_lines(lines)),
            Geometry::Polygon(polygon) => {
                Ok(self.clip_areas(&MultiPolygon::new(vec![polygon.clone()])))
            }
            Geometry::MultiPolygon(polygons) => Ok(self.clip_areas(polygons)),
            Geometry::Point(point) => Ok(clip_point(&self.region, *point)),
            Geometry::MultiPoint(_) => Err(ClipError::Unsupported {
                geometry: "multi point",
            }),
            Geometry::Line(_) => Err(ClipError::Unsupported { geometry: "line" }),
            Geometry::GeometryCollection(_) => Err(ClipError::Unsupported {
                geometry: "geometry collection",
            }),
            Geometry::Rect(_) => Err(ClipError::Unsupported { geometry: "rect" }),
            Geometry::Triangle(_) => Err(ClipError::Unsupported {
                geometry: "triangle",
            }),
        }
    }
}

fn clip_point(region: &MultiPolygon<f64>, point: Point<f64>) -> Vec<Geometry> {
    if region.intersects(&point) {
        vec![Geometry::Point(point)]
    } else {
        Vec::new()
    }
}
