//! # Field Segmentation
//!
//! Turns a GPS trace recorded while walking or driving across farmland into a
//! report of the fields that were visited: how large each one is, how long was
//! spent inside it, and how far and how long the travel between fields was.
//!
//! This library provides:
//! - Density-based clustering (DBSCAN) of fixes into fields and noise
//! - Convex-hull area estimation with a calibrated correction factor
//! - Dwell time and chronological ordering of fields
//! - Lead-in, inter-field and noise-to-field travel segments
//!
//! ## Features
//!
//! - **`parallel`** - Process independent traces in parallel with rayon
//! - **`serde`** - Serialize/deserialize config and report types
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use field_segmentation::{run, GpsFix, SegmentationConfig};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
//!
//! // A 5 x 4 walk over a small plot, one fix every 30 seconds
//! let fixes: Vec<GpsFix> = (0..20)
//!     .map(|i| {
//!         let (row, col) = (i / 5, i % 5);
//!         GpsFix::new(
//!             19.5800 + row as f64 * 2.5e-5,
//!             74.6070 + col as f64 * 2.5e-5,
//!             start + Duration::seconds(30 * i as i64),
//!         )
//!     })
//!     .collect();
//!
//! let config = SegmentationConfig { min_area_gunthas: 0.5, ..Default::default() };
//! let report = run(fixes, &config).unwrap();
//!
//! assert_eq!(report.fields.len(), 1);
//! for entry in &report.fields {
//!     println!(
//!         "Field {}: {:.2} gunthas, {:.1} min",
//!         entry.field.index, entry.field.area_gunthas, entry.field.dwell_minutes
//!     );
//! }
//! ```

use chrono::{DateTime, Utc};

pub mod error;
pub use error::{Result, SegmentationError};

pub mod geo_utils;

// Density-based clustering of fixes
pub mod cluster;
pub use cluster::{ClusterId, ClusterLabel, Clusterer, Dbscan};

// Convex hull area estimation
pub mod area;
pub use area::{
    AreaEstimate, AreaEstimator, DEFAULT_SHAPE_CORRECTION_FACTOR, METERS_PER_DEGREE,
    SQUARE_METERS_PER_GUNTHA,
};

// Per-cluster aggregation and area filtering
pub mod fields;
pub use fields::{aggregate, Aggregation, Field, RejectedCluster};

// Travel between fields
pub mod travel;
pub use travel::{travel, NoiseSegment, TravelPlan, TravelSegment};

// Report types
pub mod report;
pub use report::{Diagnostic, FieldEntry, FieldReport, FieldRow, TraceSummary};

// Orchestration
pub mod pipeline;
pub use pipeline::{run, run_batch, SegmentationPipeline};

#[cfg(feature = "parallel")]
pub use pipeline::run_batch_parallel;

// ============================================================================
// Core Types
// ============================================================================

/// A latitude/longitude pair in degrees.
///
/// # Example
/// ```
/// use field_segmentation::GpsPoint;
/// let point = GpsPoint::new(19.5800, 74.6070);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A single timestamped GPS sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl GpsFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self { latitude, longitude, timestamp }
    }

    /// The fix's position without its timestamp.
    #[inline]
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    pub fn is_valid(&self) -> bool {
        self.point().is_valid()
    }
}

/// Bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// A validated, chronologically ordered sequence of fixes.
///
/// Construction guarantees at least one fix, valid coordinates on every fix,
/// and non-decreasing timestamps. The trace is never modified afterwards;
/// clustering produces a separate label vector.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTrace {
    fixes: Vec<GpsFix>,
}

impl PointTrace {
    /// Validate fixes that are already in chronological order.
    ///
    /// # Example
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use field_segmentation::{GpsFix, PointTrace};
    ///
    /// let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    /// assert!(PointTrace::new(vec![GpsFix::new(19.58, 74.607, t)]).is_ok());
    /// assert!(PointTrace::new(vec![]).is_err());
    /// ```
    pub fn new(fixes: Vec<GpsFix>) -> Result<Self> {
        if fixes.is_empty() {
            return Err(SegmentationError::InvalidTrace(
                "trace contains no fixes".to_string(),
            ));
        }

        if let Some((i, fix)) = fixes.iter().enumerate().find(|(_, f)| !f.is_valid()) {
            return Err(SegmentationError::InvalidTrace(format!(
                "fix {} has invalid coordinates ({}, {})",
                i, fix.latitude, fix.longitude
            )));
        }

        if let Some(i) = fixes
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(SegmentationError::InvalidTrace(format!(
                "fix {} is earlier than fix {}",
                i + 1,
                i
            )));
        }

        Ok(Self { fixes })
    }

    /// Stable-sort fixes by timestamp, then validate.
    ///
    /// Fixes sharing a timestamp keep their relative order.
    pub fn from_unordered(mut fixes: Vec<GpsFix>) -> Result<Self> {
        fixes.sort_by_key(|f| f.timestamp);
        Self::new(fixes)
    }

    pub fn fixes(&self) -> &[GpsFix] {
        &self.fixes
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    /// Always false for a constructed trace.
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn first(&self) -> &GpsFix {
        &self.fixes[0]
    }

    pub fn last(&self) -> &GpsFix {
        &self.fixes[self.fixes.len() - 1]
    }

    /// Positions of all fixes, in trace order.
    pub fn points(&self) -> Vec<GpsPoint> {
        self.fixes.iter().map(GpsFix::point).collect()
    }
}

/// Configuration for field segmentation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentationConfig {
    /// DBSCAN neighbourhood radius, in degrees (not meters).
    /// Default: 8e-5 (~9 meters), tuned for foot/vehicle sampling density
    pub eps_degrees: f64,

    /// Minimum neighbourhood size (including the point itself) for a core point.
    /// Default: 11
    pub min_points: u32,

    /// Clusters smaller than this are reclassified as noise.
    /// Default: 5.0 gunthas (~506 m²)
    pub min_area_gunthas: f64,

    /// Multiplier compensating for the convex hull overestimating an
    /// irregular field boundary. Default: 0.8
    pub shape_correction_factor: f64,

    /// Meters per degree used for the area conversion. Default: 111,000
    pub meters_per_degree: f64,

    /// Pair every noise fix with its nearest field. Default: false
    pub include_noise_segments: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            eps_degrees: 8e-5,
            min_points: 11,
            min_area_gunthas: 5.0,
            shape_correction_factor: DEFAULT_SHAPE_CORRECTION_FACTOR,
            meters_per_degree: METERS_PER_DEGREE,
            include_noise_segments: false,
        }
    }
}

impl SegmentationConfig {
    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SegmentationError::Configuration(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )))
            }
        }

        positive("eps_degrees", self.eps_degrees)?;
        if self.min_points == 0 {
            return Err(SegmentationError::Configuration(
                "min_points must be at least 1".to_string(),
            ));
        }
        positive("min_area_gunthas", self.min_area_gunthas)?;
        positive("shape_correction_factor", self.shape_correction_factor)?;
        positive("meters_per_degree", self.meters_per_degree)?;
        Ok(())
    }

    pub(crate) fn area_estimator(&self) -> AreaEstimator {
        AreaEstimator::new(self.shape_correction_factor, self.meters_per_degree)
    }

    pub(crate) fn dbscan(&self) -> Dbscan {
        Dbscan::new(self.eps_degrees, self.min_points as usize)
    }
}

// ============================================================================
// Tests
// ============================================================================
