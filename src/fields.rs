//! # Field Aggregation
//!
//! Turns clustered fixes into [`Field`]s: dwell time, start/end instants and
//! shape, with clusters below the minimum area demoted back to noise.
//!
//! Fields are ordered by the first time any of their fixes appears in the
//! trace. Cluster id values play no part in ordering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;

use crate::geo_utils::{compute_bounds, compute_center, signed_seconds};
use crate::{AreaEstimate, Bounds, ClusterId, ClusterLabel, GpsFix, GpsPoint};

/// A visited plot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    /// 1-based position in visiting order
    pub index: usize,
    pub cluster: ClusterId,
    /// Member fixes in chronological order
    pub points: Vec<GpsFix>,
    /// Position of each member fix in the original trace
    pub fix_indices: Vec<usize>,
    /// Convex hull used for the area estimate
    pub boundary: Vec<GpsPoint>,
    pub area_square_meters: f64,
    pub area_gunthas: f64,
    /// Minutes between the earliest and latest member fix
    pub dwell_minutes: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub centroid: GpsPoint,
    pub bounds: Bounds,
}

impl Field {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Where the field was entered. `points` is chronological, so of several
    /// fixes sharing the earliest timestamp the first in trace order wins.
    pub fn first_fix(&self) -> Option<&GpsFix> {
        self.points.first()
    }

    /// Where the field was left; the last of any fixes sharing the latest
    /// timestamp.
    pub fn last_fix(&self) -> Option<&GpsFix> {
        self.points.last()
    }
}

/// A cluster that did not reach the minimum area.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RejectedCluster {
    pub cluster: ClusterId,
    pub point_count: usize,
    pub area_gunthas: f64,
    pub degenerate: bool,
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Surviving fields in visiting order
    pub fields: Vec<Field>,
    /// Per-fix labels with rejected clusters turned into noise
    pub labels: Vec<ClusterLabel>,
    pub rejected: Vec<RejectedCluster>,
}

/// Member indices of every cluster, in order of first appearance.
pub(crate) fn group_members(labels: &[ClusterLabel]) -> Vec<(ClusterId, Vec<usize>)> {
    let mut position: HashMap<ClusterId, usize> = HashMap::new();
    let mut groups: Vec<(ClusterId, Vec<usize>)> = Vec::new();

    for (i, label) in labels.iter().enumerate() {
        if let ClusterLabel::Member(id) = label {
            let slot = *position.entry(*id).or_insert_with(|| {
                groups.push((*id, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(i);
        }
    }

    groups
}

/// Build fields from labelled fixes and per-cluster area estimates.
///
/// A cluster is kept only if its area is at least `min_area_gunthas`;
/// otherwise every one of its fixes is relabelled as noise. Clusters missing
/// from `areas` count as zero area.
pub fn aggregate(
    fixes: &[GpsFix],
    labels: &[ClusterLabel],
    areas: &HashMap<ClusterId, AreaEstimate>,
    min_area_gunthas: f64,
) -> Aggregation {
    let mut final_labels = labels.to_vec();
    let mut fields = Vec::new();
    let mut rejected = Vec::new();

    for (cluster, members) in group_members(labels) {
        let estimate = areas.get(&cluster);
        let area_gunthas = estimate.map_or(0.0, |a| a.gunthas);

        if area_gunthas < min_area_gunthas {
            debug!(
                "[Fields] {} rejected: {:.2} gunthas < {:.2} ({} fixes)",
                cluster,
                area_gunthas,
                min_area_gunthas,
                members.len()
            );
            for &i in &members {
                final_labels[i] = ClusterLabel::Noise;
            }
            rejected.push(RejectedCluster {
                cluster,
                point_count: members.len(),
                area_gunthas,
                degenerate: estimate.map_or(true, |a| a.degenerate),
            });
            continue;
        }

        let points: Vec<GpsFix> = members.iter().map(|&i| fixes[i]).collect();
        let positions: Vec<GpsPoint> = points.iter().map(GpsFix::point).collect();

        let (start, end) = points.iter().fold(
            (points[0].timestamp, points[0].timestamp),
            |(lo, hi), f| (lo.min(f.timestamp), hi.max(f.timestamp)),
        );

        fields.push(Field {
            index: fields.len() + 1,
            cluster,
            fix_indices: members,
            boundary: estimate.map(|a| a.hull.clone()).unwrap_or_default(),
            area_square_meters: estimate.map_or(0.0, |a| a.square_meters),
            area_gunthas,
            dwell_minutes: signed_seconds(start, end) / 60.0,
            start,
            end,
            centroid: compute_center(&positions),
            bounds: compute_bounds(&positions),
            points,
        });
    }

    debug!(
        "[Fields] {} fields kept, {} clusters rejected",
        fields.len(),
        rejected.len()
    );

    Aggregation { fields, labels: final_labels, rejected }
}
