//! Error type for trace and configuration problems.
//!
//! Only problems that make a trace impossible to process are errors. Outcomes
//! such as "no fields found" or a collinear cluster are reported as
//! [`Diagnostic`](crate::Diagnostic)s on an otherwise valid report.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// The trace is empty or contains malformed fixes.
    #[error("invalid trace: {0}")]
    InvalidTrace(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
