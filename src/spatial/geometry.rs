// In: src/spatial/geometry.rs

//! Small geometric helpers shared by the area labeler and the nearest-point index.
//!
//! Coordinates arrive in degrees as separate `lon` and `lat` arrays. Distances on
//! the sphere are computed as central angles in radians; the caller multiplies by
//! the configured Earth radius.

use geo::{Coord, LineString, Polygon};

use crate::error::{AfvalError, Result};

/// A `(lon, lat)` pair in degrees.
pub type LonLat = (f64, f64);

/// Central angle (radians) between two `(lat, lon)` points given in degrees.
pub fn haversine_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Projects a `(lat, lon)` point in degrees onto the unit sphere.
///
/// Straight-line (chord) distance between unit vectors grows monotonically with
/// the central angle, so a Euclidean nearest neighbor here is also the nearest
/// neighbor on the sphere.
pub fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Converts a chord length between unit vectors back to the central angle.
pub fn chord_to_angle(chord: f64) -> f64 {
    2.0 * (chord / 2.0).clamp(-1.0, 1.0).asin()
}

/// Builds a polygon from parallel longitude/latitude rings. The ring is closed
/// implicitly. Rings with fewer than three vertices contain no point.
pub fn polygon_from_ring(lon: &[f64], lat: &[f64]) -> Result<Polygon<f64>> {
    if lon.len() != lat.len() {
        return Err(AfvalError::InvalidGeometry(format!(
            "ring has {} longitudes but {} latitudes",
            lon.len(),
            lat.len()
        )));
    }
    if let Some((x, y)) = lon.iter().zip(lat).find(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(AfvalError::InvalidGeometry(format!(
            "ring vertex ({x}, {y}) is not finite"
        )));
    }

    let ring: LineString<f64> = lon
        .iter()
        .zip(lat)
        .map(|(&x, &y)| Coord { x, y })
        .collect();
    Ok(Polygon::new(ring, vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, Point};

    #[test]
    fn test_haversine_angle_amsterdam_block() {
        // Dam square towards Centraal Station, roughly 800 m.
        let angle = haversine_angle(52.373_1, 4.893_2, 52.378_9, 4.900_3);
        let metres = angle * 6_364_763.0;
        assert!((metres - 805.0).abs() < 25.0, "got {metres}");
    }

    #[test]
    fn test_chord_and_angle_agree() {
        let a = unit_vector(52.37, 4.89);
        let b = unit_vector(52.38, 4.91);
        let chord = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt();
        let expected = haversine_angle(52.37, 4.89, 52.38, 4.91);
        assert!((chord_to_angle(chord) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_polygon_contains_interior_not_boundary() {
        let square = polygon_from_ring(&[0.0, 1.0, 1.0, 0.0], &[0.0, 0.0, 1.0, 1.0]).unwrap();
        assert!(square.contains(&Point::new(0.5, 0.5)));
        assert!(!square.contains(&Point::new(1.0, 0.5)));
        assert!(!square.contains(&Point::new(2.0, 0.5)));
    }

    #[test]
    fn test_polygon_rejects_mismatched_ring() {
        assert!(matches!(
            polygon_from_ring(&[0.0, 1.0], &[0.0]),
            Err(AfvalError::InvalidGeometry(_))
        ));
    }
}
