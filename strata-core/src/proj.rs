//! WGS84 to Web Mercator (EPSG:3857) reprojection.

use std::f64::consts::PI;

use geo::Coord;

/// Semi-major axis of the WGS84 ellipsoid in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the Web Mercator plane in metres.
pub const MERC_MAX: f64 = 20_037_508.342_789_244;

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_LAT: f64 = 85.051_128_779_806_6;

/// Project a WGS84 coordinate (`x = lon`, `y = lat`) to Web Mercator metres.
///
/// Latitudes are clamped to the Web Mercator limit.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use strata_core::proj::wgs84_to_merc;
///
/// let merc = wgs84_to_merc(Coord { x: 180.0, y: 0.0 });
/// assert!((merc.x - strata_core::proj::MERC_MAX).abs() < 1e-6);
/// assert!(merc.y.abs() < 1e-6);
/// ```
#[must_use]
pub fn wgs84_to_merc(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LAT, MAX_LAT);
    Coord {
        x: coord.x * MERC_MAX / 180.0,
        y: ((90.0 + lat) * PI / 360.0).tan().ln() * EARTH_RADIUS,
    }
}

/// Project a slice of WGS84 coordinates in place.
pub fn coords_to_merc(coords: &mut [Coord<f64>]) {
    for coord in coords {
        *coord = wgs84_to_merc(*coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_close(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(delta <= 1.0e-3, "expected {expected}, got {actual}");
    }

    #[rstest]
    #[case(Coord { x: 0.0, y: 0.0 }, 0.0, 0.0)]
    #[case(Coord { x: -180.0, y: 0.0 }, -MERC_MAX, 0.0)]
    #[case(Coord { x: 0.0, y: MAX_LAT }, 0.0, MERC_MAX)]
    #[case(Coord { x: 13.377_704, y: 52.516_275 }, 1_489_199.197, 6_894_018.358)]
    fn projects_reference_points(#[case] input: Coord<f64>, #[case] x: f64, #[case] y: f64) {
        let merc = wgs84_to_merc(input);
        assert_close(merc.x, x);
        assert_close(merc.y, y);
    }

    #[rstest]
    fn clamps_polar_latitudes() {
        let merc = wgs84_to_merc(Coord { x: 0.0, y: 90.0 });
        assert_close(merc.y, MERC_MAX);
    }
}
