//! # Density-Based Clustering
//!
//! Labels each fix as belonging to a field or as noise.
//!
//! ## Algorithm
//! DBSCAN over raw (latitude, longitude) pairs treated as a flat 2D space in
//! degrees. Degree distortion is negligible at field scale, and the default
//! `eps` and the area calibration both assume degree units, so the points are
//! deliberately not reprojected.
//!
//! 1. Index every point in an R-tree
//! 2. A point is *core* if at least `min_points` points (itself included) lie
//!    within `eps` of it
//! 3. Core points and everything within `eps` of them are joined transitively
//! 4. Anything left over is noise
//!
//! Cluster ids are assigned in discovery order, but callers must only rely on
//! group identity. Any other [`Clusterer`] can be swapped in.

use std::collections::VecDeque;
use std::fmt;

use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::GpsPoint;

/// Opaque identifier of a spatial cluster. The numeric value is arbitrary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterId(u32);

impl ClusterId {
    /// Wrap an identifier produced by a clustering implementation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster#{}", self.0)
    }
}

/// Per-fix clustering result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClusterLabel {
    Noise,
    Member(ClusterId),
}

impl ClusterLabel {
    pub fn is_noise(&self) -> bool {
        matches!(self, ClusterLabel::Noise)
    }

    pub fn cluster(&self) -> Option<ClusterId> {
        match self {
            ClusterLabel::Noise => None,
            ClusterLabel::Member(id) => Some(*id),
        }
    }
}

/// Partition points into clusters and noise.
///
/// Implementations must return exactly one label per input point, in input
/// order, and must be deterministic for identical input.
pub trait Clusterer {
    fn cluster(&self, points: &[GpsPoint]) -> Vec<ClusterLabel>;
}

// =============================================================================
// R-tree Indexed Point for Spatial Queries
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

fn build_rtree(points: &[GpsPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint {
            idx: i,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();
    RTree::bulk_load(indexed)
}

// =============================================================================
// DBSCAN
// =============================================================================

/// DBSCAN in degree space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    /// Neighbourhood radius in degrees
    pub eps_degrees: f64,
    /// Minimum neighbourhood size, including the point itself
    pub min_points: usize,
}

impl Dbscan {
    pub fn new(eps_degrees: f64, min_points: usize) -> Self {
        Self { eps_degrees, min_points }
    }
}

impl Clusterer for Dbscan {
    /// # Example
    /// ```
    /// use field_segmentation::{Clusterer, Dbscan, GpsPoint};
    ///
    /// let mut points: Vec<GpsPoint> = (0..12)
    ///     .map(|i| GpsPoint::new(19.58 + (i % 4) as f64 * 1e-5, 74.607 + (i / 4) as f64 * 1e-5))
    ///     .collect();
    /// points.push(GpsPoint::new(19.60, 74.62)); // far away
    ///
    /// let labels = Dbscan::new(8e-5, 11).cluster(&points);
    /// assert!(labels[..12].iter().all(|l| l.cluster() == labels[0].cluster()));
    /// assert!(labels[12].is_noise());
    /// ```
    fn cluster(&self, points: &[GpsPoint]) -> Vec<ClusterLabel> {
        self.label(points).0
    }
}

impl Dbscan {
    /// Labels plus the largest length the expansion queue reached.
    ///
    /// A point is marked visited when it is queued, so it enters the queue at
    /// most once and the queue never holds more than `points.len()` entries.
    fn label(&self, points: &[GpsPoint]) -> (Vec<ClusterLabel>, usize) {
        let n = points.len();
        let mut labels = vec![ClusterLabel::Noise; n];

        if n == 0 || n < self.min_points {
            debug!(
                "[Dbscan] {} points is below min_points={}, all noise",
                n, self.min_points
            );
            return (labels, 0);
        }

        let tree = build_rtree(points);
        let eps_sq = self.eps_degrees * self.eps_degrees;

        // Sorted so that expansion order, and hence border assignment, is stable
        let neighbours = |i: usize| -> Vec<usize> {
            let query = [points[i].latitude, points[i].longitude];
            let mut found: Vec<usize> = tree
                .locate_within_distance(query, eps_sq)
                .map(|p| p.idx)
                .collect();
            found.sort_unstable();
            found
        };

        let mut visited = vec![false; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut peak_queue = 0;
        let mut next_id: u32 = 0;

        for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;

            let mut reach = neighbours(i);
            if reach.len() < self.min_points {
                // May still be claimed as a border point later
                continue;
            }

            let id = ClusterId(next_id);
            next_id += 1;
            labels[i] = ClusterLabel::Member(id);

            loop {
                for k in reach {
                    if labels[k].is_noise() {
                        labels[k] = ClusterLabel::Member(id);
                    }
                    if !visited[k] {
                        visited[k] = true;
                        queue.push_back(k);
                    }
                }
                peak_queue = peak_queue.max(queue.len());

                let Some(j) = queue.pop_front() else {
                    break;
                };
                reach = neighbours(j);
                if reach.len() < self.min_points {
                    reach.clear();
                }
            }
        }

        let noise = labels.iter().filter(|l| l.is_noise()).count();
        debug!(
            "[Dbscan] {} points -> {} clusters, {} noise, peak queue {} (eps={}, min_points={})",
            n, next_id, noise, peak_queue, self.eps_degrees, self.min_points
        );

        (labels, peak_queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// `rows` x `cols` grid with `spacing` degrees between neighbours.
    fn grid(lat: f64, lng: f64, rows: usize, cols: usize, spacing: f64) -> Vec<GpsPoint> {
        (0..rows * cols)
            .map(|i| {
                GpsPoint::new(
                    lat + (i / cols) as f64 * spacing,
                    lng + (i % cols) as f64 * spacing,
                )
            })
            .collect()
    }

    #[test]
    fn test_too_few_points_is_all_noise() {
        let points = grid(19.58, 74.607, 2, 5, 1e-5);
        let labels = Dbscan::new(8e-5, 11).cluster(&points);
        assert_eq!(labels.len(), 10);
        assert!(labels.iter().all(|l| l.is_noise()));
    }

    #[test]
    fn test_empty_input() {
        assert!(Dbscan::new(8e-5, 1).cluster(&[]).is_empty());
    }

    #[test]
    fn test_dense_grid_is_one_cluster() {
        // Corner point of a 5x4 grid at 2.5e-5 spacing has 13 points within 8e-5
        let points = grid(19.58, 74.607, 4, 5, 2.5e-5);
        let labels = Dbscan::new(8e-5, 11).cluster(&points);
        let ids: HashSet<_> = labels.iter().map(|l| l.cluster()).collect();
        assert_eq!(ids.len(), 1);
        assert!(labels[0].cluster().is_some());
    }

    #[test]
    fn test_separated_groups_and_noise() {
        let mut points = grid(19.58, 74.607, 4, 5, 2.5e-5);
        points.extend(grid(19.59, 74.607, 4, 5, 2.5e-5));
        points.push(GpsPoint::new(19.585, 74.610));
        let labels = Dbscan::new(8e-5, 11).cluster(&points);

        let first = labels[0].cluster().unwrap();
        let second = labels[20].cluster().unwrap();
        assert_ne!(first, second);
        assert!(labels[..20].iter().all(|l| l.cluster() == Some(first)));
        assert!(labels[20..40].iter().all(|l| l.cluster() == Some(second)));
        assert!(labels[40].is_noise());
    }

    #[test]
    fn test_border_point_joins_cluster() {
        let mut points = grid(19.58, 74.607, 4, 5, 2.5e-5);
        // 7e-5 beyond the last column: within eps of the edge but not core
        points.push(GpsPoint::new(19.58, 74.607 + 4.0 * 2.5e-5 + 7e-5));
        let labels = Dbscan::new(8e-5, 11).cluster(&points);
        assert_eq!(labels[20], labels[0]);
        assert!(!labels[20].is_noise());
    }

    #[test]
    fn test_deterministic() {
        let mut points = grid(19.58, 74.607, 4, 5, 2.5e-5);
        points.extend(grid(19.581, 74.608, 3, 5, 2.5e-5));
        let dbscan = Dbscan::new(8e-5, 11);
        assert_eq!(dbscan.cluster(&points), dbscan.cluster(&points));
    }

    #[test]
    fn test_stationary_logger_queue_stays_linear() {
        // A logger left in one spot: every fix is within eps of every other
        let n = 3000;
        let points: Vec<GpsPoint> = (0..n)
            .map(|i| GpsPoint::new(19.58 + (i % 100) as f64 * 1e-7, 74.607 + (i / 100) as f64 * 1e-7))
            .collect();
        let (labels, peak_queue) = Dbscan::new(8e-5, 11).label(&points);

        assert!(peak_queue <= n, "queue peaked at {} for {} points", peak_queue, n);
        assert!(labels.iter().all(|l| *l == ClusterLabel::Member(ClusterId(0))));
    }

    #[test]
    fn test_label_accessors() {
        let id = ClusterId::from_raw(7);
        assert_eq!(ClusterLabel::Member(id).cluster(), Some(id));
        assert_eq!(ClusterLabel::Noise.cluster(), None);
        assert_eq!(id.to_string(), "cluster#7");
    }
}
