//! Spatial math for proximity queries and route distances.

use crate::error::GeoError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean Earth radius used by every distance computation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Kilometers per degree of latitude used by the bounding-box pre-filter.
const KM_PER_DEG: f64 = 111.0;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting out-of-range or non-finite coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Re-check a point that may have been deserialized without validation.
    pub fn validate(&self) -> Result<(), GeoError> {
        Self::new(self.lat, self.lng).map(|_| ())
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Convert decimal degrees to radians.
pub fn to_radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = to_radians(lat1);
    let phi2 = to_radians(lat2);
    let dphi = to_radians(lat2 - lat1);
    let dlambda = to_radians(lon2 - lon1);
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
#[cfg(test)]
pub(crate) fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = (lon1 + y.atan2(x) + PI).rem_euclid(2.0 * PI) - PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Axis-aligned lat/lng rectangle used to narrow candidates before the exact
/// distance pass. Always a superset of the search circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Longitude-unbounded box covering a latitude band.
    fn band(min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng: -180.0,
            max_lng: 180.0,
        }
    }

    /// Box enclosing every point within `radius_km` of `center`.
    pub fn around(center: GeoPoint, radius_km: f64) -> Result<Self, GeoError> {
        center.validate()?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_km));
        }

        let lat_range = radius_km / KM_PER_DEG;
        let min_lat = (center.lat - lat_range).max(-90.0);
        let max_lat = (center.lat + lat_range).min(90.0);

        // The circle covers a pole: every meridian passes through it.
        if center.lat.abs() + lat_range >= 90.0 {
            return Ok(Self::band(min_lat, max_lat));
        }

        // Widest longitude extent is at the poleward edge of the band.
        let poleward_lat = min_lat.abs().max(max_lat.abs());
        let lng_range = radius_km / (KM_PER_DEG * to_radians(poleward_lat).cos());
        if !lng_range.is_finite() || lng_range >= 180.0 {
            return Ok(Self::band(min_lat, max_lat));
        }

        let min_lng = center.lng - lng_range;
        let max_lng = center.lng + lng_range;
        // TODO: split into two boxes at the antimeridian instead of dropping the longitude bound.
        if min_lng < -180.0 || max_lng > 180.0 {
            return Ok(Self::band(min_lat, max_lat));
        }

        Ok(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Whether the longitude bound was dropped (poles, antimeridian).
    pub fn spans_all_longitudes(&self) -> bool {
        self.min_lng <= -180.0 && self.max_lng >= 180.0
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(33.6846, -117.8265, 33.6846, -117.8265);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn new_york_to_los_angeles() {
        let nyc = point(40.7128, -74.0060);
        let la = point(34.0522, -118.2437);
        let dist = nyc.distance_to(&la);
        assert!(
            (dist - 3_935_000.0).abs() < 39_350.0,
            "expected ~3,935 km, got {dist}"
        );
    }

    #[test]
    fn distance_is_symmetric_and_obeys_triangle_inequality() {
        let points = [
            point(0.0, 0.0),
            point(51.5074, -0.1278),
            point(-33.8688, 151.2093),
            point(89.9, 10.0),
            point(-45.0, 179.9),
            point(35.6762, 139.6503),
        ];
        for a in &points {
            assert_eq!(a.distance_to(a), 0.0);
            for b in &points {
                let ab = a.distance_to(b);
                assert!((ab - b.distance_to(a)).abs() < 1e-6);
                if a != b {
                    assert!(ab > 0.0);
                }
                for c in &points {
                    assert!(ab <= a.distance_to(c) + c.distance_to(b) + 1e-6);
                }
            }
        }
    }

    #[test]
    fn to_radians_matches_std() {
        assert!((to_radians(180.0) - PI).abs() < 1e-15);
        assert!((to_radians(57.3) - 57.3_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert_eq!(GeoPoint::new(90.5, 0.0), Err(GeoError::InvalidLatitude(90.5)));
        assert_eq!(
            GeoPoint::new(0.0, -181.0),
            Err(GeoError::InvalidLongitude(-181.0))
        );
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn bounding_box_matches_reference_formula_at_mid_latitudes() {
        let center = point(40.0, -74.0);
        let bbox = BoundingBox::around(center, 10.0).unwrap();
        let lat_range = 10.0 / 111.0;
        assert!((bbox.min_lat - (40.0 - lat_range)).abs() < 1e-12);
        assert!((bbox.max_lat - (40.0 + lat_range)).abs() < 1e-12);
        // Never narrower than the equator-facing reference width.
        let reference = 10.0 / (111.0 * to_radians(40.0).cos());
        assert!(bbox.max_lng - center.lng >= reference);
        assert!(!bbox.spans_all_longitudes());
    }

    #[test]
    fn bounding_box_rejects_bad_radius() {
        let center = point(0.0, 0.0);
        assert_eq!(
            BoundingBox::around(center, 0.0),
            Err(GeoError::InvalidRadius(0.0))
        );
        assert!(BoundingBox::around(center, -5.0).is_err());
        assert!(BoundingBox::around(center, f64::INFINITY).is_err());
    }

    #[test]
    fn bounding_box_at_pole_is_longitude_unbounded() {
        let bbox = BoundingBox::around(point(90.0, 0.0), 5.0).unwrap();
        assert!(bbox.spans_all_longitudes());
        assert_eq!(bbox.max_lat, 90.0);
        assert!(bbox.min_lng.is_finite() && bbox.max_lng.is_finite());

        let bbox = BoundingBox::around(point(-90.0, 45.0), 5.0).unwrap();
        assert!(bbox.spans_all_longitudes());
        assert_eq!(bbox.min_lat, -90.0);
    }

    #[test]
    fn bounding_box_across_antimeridian_is_longitude_unbounded() {
        let bbox = BoundingBox::around(point(-17.7, 179.95), 20.0).unwrap();
        assert!(bbox.spans_all_longitudes());
        assert!(bbox.contains(&point(-17.7, -179.95)));
    }

    #[test]
    fn bounding_box_never_rejects_points_on_the_circle() {
        let centers = [
            point(0.0, 0.0),
            point(45.0, 10.0),
            point(-60.0, -70.0),
            point(80.0, 30.0),
            point(88.5, -120.0),
            point(-89.0, 0.0),
        ];
        let radii_km = [0.5, 10.0, 100.0, 500.0];
        for center in centers {
            for radius_km in radii_km {
                let bbox = BoundingBox::around(center, radius_km).unwrap();
                // Slightly inside the circle at every 10 degrees of bearing.
                for step in 0..36 {
                    let bearing = to_radians(step as f64 * 10.0);
                    let (lat, lng) =
                        offset_by_bearing(center.lat, center.lng, radius_km * 999.0, bearing);
                    let candidate = point(lat, lng);
                    assert!(
                        bbox.contains(&candidate),
                        "{candidate:?} within {radius_km} km of {center:?} fell outside {bbox:?}"
                    );
                }
            }
        }
    }
}
