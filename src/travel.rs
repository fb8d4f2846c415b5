//! # Travel Between Fields
//!
//! Distance and time spent moving between fields, measured with great-circle
//! distance (not the degree-space approximation used for clustering).
//!
//! Three kinds of segment are produced:
//!
//! | Segment | From | To | Elapsed |
//! |---------|------|----|---------|
//! | Lead-in | first fix of the trace | first fix of field 1 | field 1 start − trace start |
//! | Inter-field | last fix of field *i* | first fix of field *i+1* | start(*i+1*) − end(*i*) |
//! | Noise | a noise fix | first fix of the nearest field | field start − fix time |
//!
//! Elapsed times are signed. A negative inter-field time means two fields'
//! time ranges overlap and is reported as-is.

use chrono::{DateTime, Utc};
use log::debug;

use crate::geo_utils::{fix_distance, signed_seconds};
use crate::{ClusterLabel, Field, GpsFix, GpsPoint, PointTrace};

/// Movement from one fix to another.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TravelSegment {
    pub from: GpsPoint,
    pub to: GpsPoint,
    /// Great-circle distance in meters
    pub distance_m: f64,
    pub departed: DateTime<Utc>,
    pub arrived: DateTime<Utc>,
    /// `arrived - departed`, may be negative
    pub elapsed_seconds: f64,
}

impl TravelSegment {
    /// Segment from `from` to `to`, timed by their timestamps.
    pub fn between(from: &GpsFix, to: &GpsFix) -> Self {
        Self {
            from: from.point(),
            to: to.point(),
            distance_m: fix_distance(from, to),
            departed: from.timestamp,
            arrived: to.timestamp,
            elapsed_seconds: signed_seconds(from.timestamp, to.timestamp),
        }
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_seconds / 60.0
    }

    /// Average speed in km/h, `None` unless elapsed time is positive.
    pub fn speed_kmh(&self) -> Option<f64> {
        if self.elapsed_seconds > 0.0 {
            Some(self.distance_m / self.elapsed_seconds * 3.6)
        } else {
            None
        }
    }
}

/// A fix outside every field, paired with the closest field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoiseSegment {
    /// Position of the fix in the trace
    pub fix_index: usize,
    pub fix: GpsFix,
    /// [`Field::index`] of the nearest field
    pub nearest_field: usize,
    pub travel: TravelSegment,
}

/// All travel segments for one trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelPlan {
    /// Present whenever at least one field exists
    pub lead_in: Option<TravelSegment>,
    /// `inter_field[i]` leaves field `i` (0-based) for field `i + 1`
    pub inter_field: Vec<TravelSegment>,
    /// Empty unless noise segments were requested
    pub noise: Vec<NoiseSegment>,
}

/// Compute lead-in, inter-field and (optionally) noise segments.
///
/// `fields` must be in visiting order and `labels` must be the final labels
/// after area filtering, so fixes of rejected clusters count as noise.
pub fn travel(
    trace: &PointTrace,
    fields: &[Field],
    labels: &[ClusterLabel],
    include_noise: bool,
) -> TravelPlan {
    let Some(first_field) = fields.first() else {
        return TravelPlan::default();
    };

    let lead_in = first_field
        .first_fix()
        .map(|entry| TravelSegment::between(trace.first(), entry));

    let inter_field: Vec<TravelSegment> = fields
        .windows(2)
        .filter_map(|pair| Some(TravelSegment::between(pair[0].last_fix()?, pair[1].first_fix()?)))
        .collect();

    let noise = if include_noise {
        noise_segments(trace.fixes(), fields, labels)
    } else {
        Vec::new()
    };

    debug!(
        "[Travel] {} inter-field segments, {} noise segments",
        inter_field.len(),
        noise.len()
    );

    TravelPlan { lead_in, inter_field, noise }
}

fn noise_segments(fixes: &[GpsFix], fields: &[Field], labels: &[ClusterLabel]) -> Vec<NoiseSegment> {
    fixes
        .iter()
        .zip(labels)
        .enumerate()
        .filter(|(_, (_, label))| label.is_noise())
        .filter_map(|(i, (fix, _))| {
            let field = nearest_field(fix, fields)?;
            Some(NoiseSegment {
                fix_index: i,
                fix: *fix,
                nearest_field: field.index,
                travel: TravelSegment::between(fix, field.first_fix()?),
            })
        })
        .collect()
}

/// Field whose first fix is closest to `fix`. Ties go to the earlier field.
fn nearest_field<'a>(fix: &GpsFix, fields: &'a [Field]) -> Option<&'a Field> {
    let mut best: Option<(&Field, f64)> = None;
    for field in fields {
        let Some(entry) = field.first_fix() else {
            continue;
        };
        let dist = fix_distance(fix, entry);
        match best {
            Some((_, best_dist)) if best_dist <= dist => {}
            _ => best = Some((field, dist)),
        }
    }
    best.map(|(field, _)| field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bounds, ClusterId};
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn field(index: usize, fixes: Vec<GpsFix>) -> Field {
        let start = fixes.iter().map(|f| f.timestamp).min().unwrap();
        let end = fixes.iter().map(|f| f.timestamp).max().unwrap();
        Field {
            index,
            cluster: ClusterId::from_raw(index as u32),
            fix_indices: Vec::new(),
            boundary: Vec::new(),
            area_square_meters: 1000.0,
            area_gunthas: 1000.0 / 101.17,
            dwell_minutes: signed_seconds(start, end) / 60.0,
            start,
            end,
            centroid: fixes[0].point(),
            bounds: Bounds { min_lat: 0.0, max_lat: 0.0, min_lng: 0.0, max_lng: 0.0 },
            points: fixes,
        }
    }

    #[test]
    fn test_no_fields_no_segments() {
        let trace = PointTrace::new(vec![GpsFix::new(19.58, 74.607, t(0))]).unwrap();
        let plan = travel(&trace, &[], &[ClusterLabel::Noise], true);
        assert_eq!(plan, TravelPlan::default());
    }

    #[test]
    fn test_lead_in_and_inter_field() {
        let a = vec![GpsFix::new(19.580, 74.607, t(60)), GpsFix::new(19.5801, 74.607, t(120))];
        let b = vec![GpsFix::new(19.582, 74.607, t(300)), GpsFix::new(19.5821, 74.607, t(360))];
        let start = GpsFix::new(19.579, 74.607, t(0));

        let mut all = vec![start];
        all.extend(a.iter().copied());
        all.extend(b.iter().copied());
        let trace = PointTrace::new(all).unwrap();
        let fields = vec![field(1, a), field(2, b)];

        let plan = travel(&trace, &fields, &[ClusterLabel::Noise; 5], false);

        let lead_in = plan.lead_in.unwrap();
        assert_eq!(lead_in.elapsed_seconds, 60.0);
        assert!((lead_in.distance_m - 111.2).abs() < 0.5);

        assert_eq!(plan.inter_field.len(), 1);
        let hop = &plan.inter_field[0];
        assert_eq!(hop.from, GpsPoint::new(19.5801, 74.607));
        assert_eq!(hop.to, GpsPoint::new(19.582, 74.607));
        assert_eq!(hop.elapsed_seconds, 180.0);
        assert!((hop.elapsed_minutes() - 3.0).abs() < 1e-9);
        assert!((hop.distance_m - 211.3).abs() < 0.5);
        assert!(plan.noise.is_empty());
    }

    #[test]
    fn test_overlapping_fields_report_negative_time() {
        // Second field starts before the first one ends
        let a = vec![GpsFix::new(19.580, 74.607, t(0)), GpsFix::new(19.580, 74.6071, t(600))];
        let b = vec![GpsFix::new(19.590, 74.607, t(300)), GpsFix::new(19.590, 74.6071, t(900))];
        let trace = PointTrace::from_unordered(a.iter().chain(b.iter()).copied().collect()).unwrap();
        let fields = vec![field(1, a), field(2, b)];

        let plan = travel(&trace, &fields, &[ClusterLabel::Noise; 4], false);
        assert_eq!(plan.inter_field[0].elapsed_seconds, -300.0);
        assert_eq!(plan.inter_field[0].speed_kmh(), None);
    }

    #[test]
    fn test_noise_pairs_with_nearest_field() {
        let a = vec![GpsFix::new(19.580, 74.607, t(100))];
        let b = vec![GpsFix::new(19.590, 74.607, t(200))];
        let stray_near_b = GpsFix::new(19.5895, 74.607, t(150));
        let stray_near_a = GpsFix::new(19.5805, 74.607, t(250));

        let trace = PointTrace::new(vec![a[0], stray_near_b, b[0], stray_near_a]).unwrap();
        let labels = vec![
            ClusterLabel::Member(ClusterId::from_raw(1)),
            ClusterLabel::Noise,
            ClusterLabel::Member(ClusterId::from_raw(2)),
            ClusterLabel::Noise,
        ];
        let fields = vec![field(1, a), field(2, b)];

        let plan = travel(&trace, &fields, &labels, true);
        assert_eq!(plan.noise.len(), 2);

        assert_eq!(plan.noise[0].fix_index, 1);
        assert_eq!(plan.noise[0].nearest_field, 2);
        assert_eq!(plan.noise[0].travel.elapsed_seconds, 50.0);

        assert_eq!(plan.noise[1].fix_index, 3);
        assert_eq!(plan.noise[1].nearest_field, 1);
        assert_eq!(plan.noise[1].travel.elapsed_seconds, -150.0);
        assert!((plan.noise[1].travel.distance_m - 55.6).abs() < 0.5);
    }

    #[test]
    fn test_nearest_field_tie_goes_to_earlier() {
        // Same entry point visited twice
        let a = vec![GpsFix::new(19.580, 74.607, t(0))];
        let b = vec![GpsFix::new(19.580, 74.607, t(600))];
        let fields = vec![field(1, a), field(2, b)];
        let stray = GpsFix::new(19.581, 74.607, t(300));
        assert_eq!(nearest_field(&stray, &fields).map(|f| f.index), Some(1));
        assert_eq!(nearest_field(&stray, &[]).map(|f| f.index), None);
    }

    #[test]
    fn test_speed() {
        let seg = TravelSegment::between(
            &GpsFix::new(19.580, 74.607, t(0)),
            &GpsFix::new(19.581, 74.607, t(100)),
        );
        // ~111.2 m in 100 s
        assert!((seg.speed_kmh().unwrap() - 4.0).abs() < 0.01);
    }
}
