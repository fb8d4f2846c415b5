//! # Geographic Utilities
//!
//! Distance and shape helpers shared by the clustering, area and travel stages.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`fix_distance`] | Great-circle distance between two timestamped fixes |
//! | [`polyline_length`] | Walked length of a sequence of fixes in meters |
//! | [`compute_bounds`] | Bounding box of a point set |
//! | [`compute_center`] | Arithmetic centroid of a point set |
//! | [`signed_seconds`] | Signed elapsed time between two instants |
//!
//! ## Example
//!
//! ```rust
//! use field_segmentation::{GpsPoint, geo_utils};
//!
//! let gate = GpsPoint::new(19.5800, 74.6070);
//! let well = GpsPoint::new(19.5810, 74.6070);
//!
//! // 0.001 degrees of latitude is roughly 111 meters
//! let dist = geo_utils::haversine_distance(&gate, &well);
//! assert!((dist - 111.0).abs() < 1.0);
//! ```
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 latitude/longitude in degrees. Distances are
//! computed on a sphere of radius 6,371 km (via [`geo::Haversine`]), which is
//! accurate to within 0.3% at field scale.

use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};

use crate::{Bounds, GpsFix, GpsPoint};

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two GPS points in meters.
///
/// ```rust
/// use field_segmentation::{GpsPoint, geo_utils};
///
/// let p = GpsPoint::new(19.58, 74.607);
/// assert_eq!(geo_utils::haversine_distance(&p, &p), 0.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Great-circle distance between two fixes in meters. Timestamps are ignored.
#[inline]
pub fn fix_distance(a: &GpsFix, b: &GpsFix) -> f64 {
    haversine_distance(&a.point(), &b.point())
}

/// Total walked length of a sequence of fixes in meters.
///
/// Sums the haversine distance between consecutive fixes. Empty or
/// single-fix sequences return 0.0.
pub fn polyline_length(fixes: &[GpsFix]) -> f64 {
    if fixes.len() < 2 {
        return 0.0;
    }

    fixes
        .windows(2)
        .map(|w| fix_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Shape Functions
// =============================================================================

/// Bounding box of a point set.
///
/// For empty input the returned bounds are inverted (min > max), which
/// contains nothing.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

/// Arithmetic mean of latitudes and longitudes.
///
/// Suitable for field-sized areas; does not handle the antimeridian.
/// Returns (0, 0) for empty input.
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GpsPoint::new(sum_lat / n, sum_lng / n)
}

// =============================================================================
// Time Functions
// =============================================================================

/// Seconds from `from` to `to`, negative when `to` is earlier.
#[inline]
pub fn signed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn fix_at(lat: f64, lng: f64, secs: i64) -> GpsFix {
        GpsFix::new(lat, lng, Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap())
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // Ahmednagar to Pune is roughly 110 km
        let ahmednagar = GpsPoint::new(19.0948, 74.7480);
        let pune = GpsPoint::new(18.5204, 73.8567);
        let dist = haversine_distance(&ahmednagar, &pune);
        assert!(approx_eq(dist, 112_000.0, 5_000.0));
    }

    #[test]
    fn test_polyline_length_short_inputs() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[fix_at(19.58, 74.607, 0)]), 0.0);
    }

    #[test]
    fn test_polyline_length_sums_legs() {
        let fixes = vec![
            fix_at(19.5800, 74.6070, 0),
            fix_at(19.5810, 74.6070, 60),
            fix_at(19.5820, 74.6070, 120),
        ];
        let length = polyline_length(&fixes);
        assert!(approx_eq(length, 222.4, 1.0));
    }

    #[test]
    fn test_compute_bounds() {
        let points = vec![
            GpsPoint::new(19.580, 74.607),
            GpsPoint::new(19.581, 74.606),
            GpsPoint::new(19.5805, 74.6065),
        ];
        let bounds = compute_bounds(&points);
        assert_eq!(bounds.min_lat, 19.580);
        assert_eq!(bounds.max_lat, 19.581);
        assert_eq!(bounds.min_lng, 74.606);
        assert_eq!(bounds.max_lng, 74.607);
    }

    #[test]
    fn test_compute_center() {
        let points = vec![GpsPoint::new(19.58, 74.60), GpsPoint::new(19.60, 74.62)];
        let center = compute_center(&points);
        assert!(approx_eq(center.latitude, 19.59, 1e-9));
        assert!(approx_eq(center.longitude, 74.61, 1e-9));
        assert_eq!(compute_center(&[]), GpsPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_signed_seconds_is_signed() {
        let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let b = Utc.timestamp_opt(1_700_000_090, 0).unwrap();
        assert_eq!(signed_seconds(a, b), 90.0);
        assert_eq!(signed_seconds(b, a), -90.0);
    }
}
