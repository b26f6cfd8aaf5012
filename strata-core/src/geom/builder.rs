//! Default geometry builder backed by `geo`.

use geo::{Area, Coord, Intersects, LineString, MultiPolygon, Point, Polygon};

use crate::element::{ElementKind, Node, Relation, Way};

use super::{Geometry, GeometryBuilder, GeometryError, GeometryErrorKind, GeometryFactory};

/// Builds `geo` geometries from projected elements.
///
/// The builder reuses its ring buffers across relations, which is why each
/// worker owns one.
#[derive(Debug, Default)]
pub struct GeoBuilder {
    segments: Vec<Vec<Coord<f64>>>,
    rings: Vec<LineString<f64>>,
}

/// Factory handing out [`GeoBuilder`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoBuilderFactory;

impl GeometryFactory for GeoBuilderFactory {
    fn new_builder(&self) -> Box<dyn GeometryBuilder> {
        Box::new(GeoBuilder::default())
    }
}

fn ensure_finite(coords: &[Coord<f64>]) -> Result<(), GeometryError> {
    if coords.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        Ok(())
    } else {
        Err(GeometryErrorKind::InvalidCoordinate.into())
    }
}

fn is_closed_ring(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

impl GeoBuilder {
    /// Join member way segments end to end until every chain closes.
    fn assemble_rings(&mut self) -> Result<(), GeometryError> {
        self.rings.clear();
        while let Some(mut current) = self.segments.pop() {
            loop {
                if is_closed_ring(&current) {
                    self.rings.push(LineString::new(current));
                    break;
                }
                let Some(tail) = current.last().copied() else {
                    break;
                };
                let position = self
                    .segments
                    .iter()
                    .position(|s| s.first() == Some(&tail) || s.last() == Some(&tail));
                let Some(index) = position else {
                    self.segments.clear();
                    return Err(GeometryErrorKind::UnclosedRing.into());
                };
                let mut next = self.segments.swap_remove(index);
                if next.first() != Some(&tail) {
                    next.reverse();
                }
                current.extend(next.into_iter().skip(1));
            }
        }
        Ok(())
    }

    /// Nest rings: largest first, each ring either opens a new exterior or
    /// becomes a hole of the first exterior containing it.
    fn nest_rings(&mut self) -> MultiPolygon<f64> {
        let mut rings: Vec<_> = self
            .rings
            .drain(..)
            .map(|ring| (Polygon::new(ring.clone(), Vec::new()).unsigned_area(), ring))
            .collect();
        rings.sort_by(|(a, _), (b, _)| b.total_cmp(a));

        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for (_, ring) in rings {
            let probe = ring.0.first().copied().map(Point::from);
            let host = probe.and_then(|point| {
                polygons
                    .iter_mut()
                    .find(|polygon| polygon.intersects(&point))
            });
            match host {
                Some(polygon) => polygon.interiors_push(ring),
                None => polygons.push(Polygon::new(ring, Vec::new())),
            }
        }
        MultiPolygon::new(polygons)
    }
}

impl GeometryBuilder for GeoBuilder {
    fn point(&mut self, node: &Node) -> Result<Geometry, GeometryError> {
        ensure_finite(&[node.coord])?;
        Ok(Geometry::Point(Point::from(node.coord)))
    }

    fn line_string(&mut self, way: &Way) -> Result<Geometry, GeometryError> {
        if way.coords.len() < 2 {
            return Err(GeometryErrorKind::TooFewPoints {
                count: way.coords.len(),
                shape: "line string",
            }
            .into());
        }
        ensure_finite(&way.coords)?;
        Ok(Geometry::LineString(LineString::new(way.coords.clone())))
    }

    fn polygon(&mut self, way: &Way) -> Result<Geometry, GeometryError> {
        if way.coords.len() < 4 {
            return Err(GeometryErrorKind::TooFewPoints {
                count: way.coords.len(),
                shape: "polygon",
            }
            .into());
        }
        if !is_closed_ring(&way.coords) {
            return Err(GeometryErrorKind::NotClosed.into());
        }
        ensure_finite(&way.coords)?;
        let exterior = LineString::new(way.coords.clone());
        Ok(Geometry::Polygon(Polygon::new(exterior, Vec::new())))
    }

    fn relation_polygon(&mut self, relation: &Relation) -> Result<Geometry, GeometryError> {
        self.segments.clear();
        for member in &relation.members {
            if member.kind != ElementKind::Way {
                continue;
            }
            let Some(way) = member.way.as_ref().filter(|way| way.is_hydrated()) else {
                self.segments.clear();
                return Err(GeometryErrorKind::MissingMember { way: member.id }.into());
            };
            ensure_finite(&way.coords)?;
            if way.coords.len() >= 2 {
                self.segments.push(way.coords.clone());
            }
        }
        if self.segments.is_empty() {
            return Err(GeometryErrorKind::NoRings.into());
        }
        self.assemble_rings()?;
        let mut multi = self.nest_rings();
        if multi.0.len() == 1 {
            if let Some(polygon) = multi.0.pop() {
                return Ok(Geometry::Polygon(polygon));
            }
        }
        Ok(Geometry::MultiPolygon(multi))
    }
}
