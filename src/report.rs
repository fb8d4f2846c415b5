//! Report types returned by the pipeline.
//!
//! A [`FieldReport`] is the only artifact of a run. Presentation code may
//! format its values but should not recompute them.

use chrono::{DateTime, Utc};

use crate::{ClusterId, Field, NoiseSegment, TravelSegment};

/// Non-fatal findings from a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostic {
    /// The trace was valid but no cluster qualified as a field
    NoFieldsDetected,
    /// The clusterer returned the wrong number of labels; every fix was
    /// treated as noise
    ClusteringFailed { expected: usize, got: usize },
    /// Hull construction was impossible; the cluster got zero area
    DegenerateGeometry { cluster: ClusterId, point_count: usize },
    /// The cluster was smaller than the minimum area and became noise
    BelowMinimumArea {
        cluster: ClusterId,
        point_count: usize,
        area_gunthas: f64,
    },
    /// A field started before its predecessor ended
    OverlappingFields {
        from_field: usize,
        to_field: usize,
        elapsed_seconds: f64,
    },
}

/// A field together with the travel that leaves it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldEntry {
    pub field: Field,
    /// Travel to the next field; `None` for the last field
    pub next: Option<TravelSegment>,
}

/// Whole-trace statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceSummary {
    pub point_count: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_minutes: f64,
    /// Mean gap between consecutive fixes, 0 for a single fix
    pub mean_sampling_interval_seconds: f64,
    /// Sum of great-circle distances between consecutive fixes
    pub path_length_m: f64,
    /// `path_length_m / total time`, `None` for a zero-length time span
    pub mean_speed_kmh: Option<f64>,
    /// Sum of field dwell times
    pub minutes_in_fields: f64,
    /// `total_minutes - minutes_in_fields`, never below zero
    pub minutes_outside_fields: f64,
}

/// One flat row per field, for tabular presentation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldRow {
    pub field_index: usize,
    pub area_gunthas: f64,
    pub dwell_minutes: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub point_count: usize,
    /// Empty for the last field
    pub distance_to_next_m: Option<f64>,
    pub time_to_next_minutes: Option<f64>,
}

/// Output of a segmentation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldReport {
    /// Fields in visiting order
    pub fields: Vec<FieldEntry>,
    /// From the first fix of the trace to the first field
    pub lead_in: Option<TravelSegment>,
    /// Noise fixes paired with their nearest field, when requested
    pub noise_segments: Vec<NoiseSegment>,
    /// Fixes outside every field, including those of rejected clusters
    pub noise_point_count: usize,
    pub summary: TraceSummary,
    pub diagnostics: Vec<Diagnostic>,
}

impl FieldReport {
    /// False when the trace was processed but no field was found.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Inter-field segments in order; one fewer than the number of fields.
    pub fn inter_field_segments(&self) -> impl Iterator<Item = &TravelSegment> {
        self.fields.iter().filter_map(|entry| entry.next.as_ref())
    }

    pub fn total_area_gunthas(&self) -> f64 {
        self.fields.iter().map(|e| e.field.area_gunthas).sum()
    }

    /// Distance walked between fields, lead-in excluded.
    pub fn total_travel_distance_m(&self) -> f64 {
        self.inter_field_segments().map(|s| s.distance_m).sum()
    }

    /// One row per field, with empty travel columns on the last row.
    pub fn rows(&self) -> Vec<FieldRow> {
        self.fields
            .iter()
            .map(|entry| FieldRow {
                field_index: entry.field.index,
                area_gunthas: entry.field.area_gunthas,
                dwell_minutes: entry.field.dwell_minutes,
                start: entry.field.start,
                end: entry.field.end,
                point_count: entry.field.point_count(),
                distance_to_next_m: entry.next.as_ref().map(|s| s.distance_m),
                time_to_next_minutes: entry.next.as_ref().map(TravelSegment::elapsed_minutes),
            })
            .collect()
    }
}
