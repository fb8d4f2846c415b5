//! # Area Estimation
//!
//! Field boundaries are never surveyed; only an interior point cloud is
//! sampled. The convex hull of that cloud is the tightest easily computed
//! enclosing polygon, and a calibrated correction factor scales its area
//! down toward the typically concave real boundary.
//!
//! ```text
//! square_meters = hull_square_degrees * shape_correction_factor * meters_per_degree^2
//! gunthas       = square_meters / 101.17
//! ```

use geo::{Area, ConvexHull, MultiPoint, Point};

use crate::GpsPoint;

/// Meters per degree of arc at the equator, as used for area conversion.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Ratio of surveyed field area to convex hull area, calibrated against
/// fields of known size.
pub const DEFAULT_SHAPE_CORRECTION_FACTOR: f64 = 0.8;

/// One guntha, the canonical reporting unit.
pub const SQUARE_METERS_PER_GUNTHA: f64 = 101.17;

/// Area estimate for one cluster.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaEstimate {
    /// Hull vertices in counter-clockwise order, ring not closed.
    /// Empty when `degenerate`.
    pub hull: Vec<GpsPoint>,
    pub square_degrees: f64,
    pub square_meters: f64,
    pub gunthas: f64,
    /// Fewer than three distinct points, or all points collinear
    pub degenerate: bool,
}

impl AreaEstimate {
    fn degenerate() -> Self {
        Self {
            hull: Vec::new(),
            square_degrees: 0.0,
            square_meters: 0.0,
            gunthas: 0.0,
            degenerate: true,
        }
    }
}

/// Converts a cluster's point cloud into a ground-area estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaEstimator {
    pub shape_correction_factor: f64,
    pub meters_per_degree: f64,
}

impl Default for AreaEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SHAPE_CORRECTION_FACTOR, METERS_PER_DEGREE)
    }
}

impl AreaEstimator {
    pub fn new(shape_correction_factor: f64, meters_per_degree: f64) -> Self {
        Self { shape_correction_factor, meters_per_degree }
    }

    /// Square meters represented by one square degree.
    #[inline]
    pub fn square_meters_per_square_degree(&self) -> f64 {
        self.shape_correction_factor * self.meters_per_degree * self.meters_per_degree
    }

    /// Estimate the area enclosed by `points`.
    ///
    /// Degenerate input yields a zero estimate rather than an error.
    ///
    /// # Example
    /// ```
    /// use field_segmentation::{AreaEstimator, GpsPoint};
    ///
    /// // 0.001 x 0.001 degree square
    /// let square = vec![
    ///     GpsPoint::new(19.580, 74.607),
    ///     GpsPoint::new(19.581, 74.607),
    ///     GpsPoint::new(19.581, 74.608),
    ///     GpsPoint::new(19.580, 74.608),
    /// ];
    /// let estimate = AreaEstimator::default().estimate(&square);
    /// assert!((estimate.square_meters - 9_856.8).abs() < 1.0);
    ///
    /// let line = vec![GpsPoint::new(19.58, 74.607), GpsPoint::new(19.59, 74.607)];
    /// assert!(AreaEstimator::default().estimate(&line).degenerate);
    /// ```
    pub fn estimate(&self, points: &[GpsPoint]) -> AreaEstimate {
        if distinct_count(points) < 3 {
            return AreaEstimate::degenerate();
        }

        let cloud = MultiPoint::new(
            points
                .iter()
                .map(|p| Point::new(p.longitude, p.latitude))
                .collect(),
        );
        let hull = cloud.convex_hull();
        let square_degrees = hull.unsigned_area();

        if !square_degrees.is_finite() || square_degrees <= 0.0 {
            return AreaEstimate::degenerate();
        }

        let mut ring: Vec<GpsPoint> = hull
            .exterior()
            .coords()
            .map(|c| GpsPoint::new(c.y, c.x))
            .collect();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        let square_meters = square_degrees * self.square_meters_per_square_degree();

        AreaEstimate {
            hull: ring,
            square_degrees,
            square_meters,
            gunthas: square_meters / SQUARE_METERS_PER_GUNTHA,
            degenerate: false,
        }
    }
}

fn distinct_count(points: &[GpsPoint]) -> usize {
    let mut sorted: Vec<(f64, f64)> = points.iter().map(|p| (p.latitude, p.longitude)).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lat: f64, lng: f64, side: f64) -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(lat, lng),
            GpsPoint::new(lat + side, lng),
            GpsPoint::new(lat + side, lng + side),
            GpsPoint::new(lat, lng + side),
        ]
    }

    #[test]
    fn test_square_area() {
        let estimate = AreaEstimator::default().estimate(&square(19.58, 74.607, 0.001));
        assert!(!estimate.degenerate);
        assert!((estimate.square_degrees - 1e-6).abs() < 1e-12);
        // 1e-6 * 0.8 * 111000^2
        assert!((estimate.square_meters - 9_856.8).abs() < 0.01);
        assert!((estimate.gunthas - 9_856.8 / 101.17).abs() < 1e-3);
        assert_eq!(estimate.hull.len(), 4);
    }

    #[test]
    fn test_interior_points_do_not_change_area() {
        let mut points = square(19.58, 74.607, 0.001);
        let outer = AreaEstimator::default().estimate(&points).square_degrees;
        points.push(GpsPoint::new(19.5805, 74.6075));
        points.push(GpsPoint::new(19.5801, 74.6079));
        let estimate = AreaEstimator::default().estimate(&points);
        assert!((estimate.square_degrees - outer).abs() < 1e-15);
        assert_eq!(estimate.hull.len(), 4);
    }

    #[test]
    fn test_correction_constants_are_applied() {
        let estimator = AreaEstimator::new(1.0, 100_000.0);
        let estimate = estimator.estimate(&square(0.0, 0.0, 0.001));
        assert!((estimate.square_meters - 10_000.0).abs() < 0.01);
    }

    #[test]
    fn test_too_few_points_is_degenerate() {
        let estimator = AreaEstimator::default();
        assert!(estimator.estimate(&[]).degenerate);
        assert!(estimator.estimate(&[GpsPoint::new(19.58, 74.607)]).degenerate);

        // Repeated fixes at the same spot count once
        let repeated = vec![GpsPoint::new(19.58, 74.607); 5];
        let estimate = estimator.estimate(&repeated);
        assert!(estimate.degenerate);
        assert_eq!(estimate.gunthas, 0.0);
    }

    #[test]
    fn test_collinear_is_degenerate() {
        let line: Vec<GpsPoint> = (0..10)
            .map(|i| GpsPoint::new(19.58 + i as f64 * 1e-5, 74.607))
            .collect();
        let estimate = AreaEstimator::default().estimate(&line);
        assert!(estimate.degenerate);
        assert_eq!(estimate.square_meters, 0.0);
        assert!(estimate.hull.is_empty());
    }
}
