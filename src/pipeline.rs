//! # Segmentation Pipeline
//!
//! Runs clustering, area estimation, aggregation and travel over one trace
//! and assembles a [`FieldReport`].
//!
//! ## Stages
//! 1. Cluster fix positions ([`Clusterer`], [`Dbscan`] by default)
//! 2. Estimate the area of every cluster ([`AreaEstimator`])
//! 3. Drop clusters below the minimum area and order the rest ([`aggregate`])
//! 4. Compute travel segments on the filtered fields ([`travel`])
//!
//! Each stage needs the full output of the previous one, so stages run
//! sequentially. Independent traces can be processed in parallel with
//! `run_batch_parallel` (feature `parallel`).
//!
//! Only an invalid configuration or trace is an error. Everything else,
//! including finding no fields at all, produces a report with
//! [`Diagnostic`]s.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::fields::group_members;
use crate::geo_utils::{polyline_length, signed_seconds};
use crate::{
    aggregate, travel, AreaEstimate, AreaEstimator, ClusterId, ClusterLabel, Clusterer, Dbscan,
    Diagnostic, Field, FieldEntry, FieldReport, GpsFix, GpsPoint, PointTrace, Result,
    SegmentationConfig, TraceSummary,
};

/// A configured, reusable segmentation run.
#[derive(Debug, Clone)]
pub struct SegmentationPipeline<C = Dbscan> {
    config: SegmentationConfig,
    clusterer: C,
    estimator: AreaEstimator,
}

impl SegmentationPipeline<Dbscan> {
    /// Validate `config` and build a pipeline using DBSCAN.
    ///
    /// # Example
    /// ```
    /// use field_segmentation::{SegmentationConfig, SegmentationPipeline};
    ///
    /// assert!(SegmentationPipeline::new(SegmentationConfig::default()).is_ok());
    ///
    /// let bad = SegmentationConfig { eps_degrees: 0.0, ..Default::default() };
    /// assert!(SegmentationPipeline::new(bad).is_err());
    /// ```
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        let clusterer = config.dbscan();
        Self::with_clusterer(config, clusterer)
    }
}

impl<C: Clusterer> SegmentationPipeline<C> {
    /// Build a pipeline around a custom clustering implementation.
    ///
    /// `eps_degrees` and `min_points` in `config` are still validated but are
    /// only used by the default clusterer.
    pub fn with_clusterer(config: SegmentationConfig, clusterer: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: config.area_estimator(),
            config,
            clusterer,
        })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segment one trace.
    pub fn run(&self, trace: &PointTrace) -> FieldReport {
        let start = std::time::Instant::now();
        let fixes = trace.fixes();
        let points = trace.points();
        let mut diagnostics = Vec::new();

        // Stage 1: clustering
        let mut labels = self.clusterer.cluster(&points);
        if labels.len() != points.len() {
            warn!(
                "[Pipeline] clusterer returned {} labels for {} fixes, treating all as noise",
                labels.len(),
                points.len()
            );
            diagnostics.push(Diagnostic::ClusteringFailed {
                expected: points.len(),
                got: labels.len(),
            });
            labels = vec![ClusterLabel::Noise; points.len()];
        }

        // Stage 2: area per cluster
        let areas = self.estimate_areas(&points, &labels, &mut diagnostics);

        // Stage 3: filter and order
        let aggregation = aggregate(fixes, &labels, &areas, self.config.min_area_gunthas);
        for rejected in &aggregation.rejected {
            diagnostics.push(Diagnostic::BelowMinimumArea {
                cluster: rejected.cluster,
                point_count: rejected.point_count,
                area_gunthas: rejected.area_gunthas,
            });
        }

        // Stage 4: travel
        let plan = travel(
            trace,
            &aggregation.fields,
            &aggregation.labels,
            self.config.include_noise_segments,
        );

        for (i, hop) in plan.inter_field.iter().enumerate() {
            if hop.elapsed_seconds < 0.0 {
                warn!(
                    "[Pipeline] field {} starts {:.0}s before field {} ends",
                    i + 2,
                    -hop.elapsed_seconds,
                    i + 1
                );
                diagnostics.push(Diagnostic::OverlappingFields {
                    from_field: i + 1,
                    to_field: i + 2,
                    elapsed_seconds: hop.elapsed_seconds,
                });
            }
        }

        if aggregation.fields.is_empty() {
            diagnostics.push(Diagnostic::NoFieldsDetected);
        }

        let summary = summarize(trace, &aggregation.fields);
        let noise_point_count = aggregation.labels.iter().filter(|l| l.is_noise()).count();

        let mut hops = plan.inter_field.into_iter();
        let fields: Vec<FieldEntry> = aggregation
            .fields
            .into_iter()
            .map(|field| FieldEntry { field, next: hops.next() })
            .collect();

        info!(
            "[Pipeline] {} fixes -> {} fields ({:.1} gunthas), {} noise, {} diagnostics in {:?}",
            fixes.len(),
            fields.len(),
            fields.iter().map(|e| e.field.area_gunthas).sum::<f64>(),
            noise_point_count,
            diagnostics.len(),
            start.elapsed()
        );

        FieldReport {
            fields,
            lead_in: plan.lead_in,
            noise_segments: plan.noise,
            noise_point_count,
            summary,
            diagnostics,
        }
    }

    fn estimate_areas(
        &self,
        points: &[GpsPoint],
        labels: &[ClusterLabel],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> HashMap<ClusterId, AreaEstimate> {
        group_members(labels)
            .into_iter()
            .map(|(cluster, members)| {
                let member_points: Vec<GpsPoint> = members.iter().map(|&i| points[i]).collect();
                let estimate = self.estimator.estimate(&member_points);
                if estimate.degenerate {
                    debug!(
                        "[Pipeline] {} is degenerate ({} fixes), area set to 0",
                        cluster,
                        members.len()
                    );
                    diagnostics.push(Diagnostic::DegenerateGeometry {
                        cluster,
                        point_count: members.len(),
                    });
                } else {
                    debug!(
                        "[Pipeline] {}: {} fixes, {:.1} m², {:.2} gunthas",
                        cluster,
                        members.len(),
                        estimate.square_meters,
                        estimate.gunthas
                    );
                }
                (cluster, estimate)
            })
            .collect()
    }
}

fn summarize(trace: &PointTrace, fields: &[Field]) -> TraceSummary {
    let fixes = trace.fixes();
    let start = trace.first().timestamp;
    let end = trace.last().timestamp;
    let total_seconds = signed_seconds(start, end);
    let path_length_m = polyline_length(fixes);

    let mean_sampling_interval_seconds = if fixes.len() > 1 {
        total_seconds / (fixes.len() - 1) as f64
    } else {
        0.0
    };

    let mean_speed_kmh = if total_seconds > 0.0 {
        Some(path_length_m / total_seconds * 3.6)
    } else {
        None
    };

    let total_minutes = total_seconds / 60.0;
    let minutes_in_fields: f64 = fields.iter().map(|f| f.dwell_minutes).sum();

    TraceSummary {
        point_count: fixes.len(),
        start,
        end,
        total_minutes,
        mean_sampling_interval_seconds,
        path_length_m,
        mean_speed_kmh,
        minutes_in_fields,
        minutes_outside_fields: (total_minutes - minutes_in_fields).max(0.0),
    }
}

/// Validate `config` and `fixes`, then segment the trace.
///
/// Configuration problems are reported before the trace is looked at.
pub fn run(fixes: Vec<GpsFix>, config: &SegmentationConfig) -> Result<FieldReport> {
    let pipeline = SegmentationPipeline::new(config.clone())?;
    let trace = PointTrace::new(fixes)?;
    Ok(pipeline.run(&trace))
}

/// Segment several independent traces one after another.
///
/// Reports are returned in input order.
pub fn run_batch(traces: &[PointTrace], config: &SegmentationConfig) -> Result<Vec<FieldReport>> {
    let pipeline = SegmentationPipeline::new(config.clone())?;
    Ok(traces.iter().map(|trace| pipeline.run(trace)).collect())
}

/// Segment several independent traces in parallel.
///
/// Same output as [`run_batch`]; traces share no state, so each is handled
/// on its own rayon task.
#[cfg(feature = "parallel")]
pub fn run_batch_parallel(
    traces: &[PointTrace],
    config: &SegmentationConfig,
) -> Result<Vec<FieldReport>> {
    use rayon::prelude::*;

    let pipeline = SegmentationPipeline::new(config.clone())?;
    info!("[Pipeline] processing {} traces in parallel", traces.len());
    Ok(traces.par_iter().map(|trace| pipeline.run(trace)).collect())
}

// ============================================================================
// Tests
// ============================================================================
