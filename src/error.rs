//! Error types for the predictor.
//!
//! Boot-time artifact failures ([`ArtifactError`]) are fatal. Request-time
//! failures split into user-facing outcomes ([`ValidationError`],
//! [`AlignmentError`]) and internal invariant violations, which
//! [`PredictError::is_internal`] tells apart.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while loading or verifying a trained artifact at startup.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The artifact file could not be read.
    #[error("failed to read {artifact} artifact at {path}: {source}")]
    Io {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact file is not valid JSON of the expected shape.
    #[error("failed to parse {artifact} artifact at {path}: {source}")]
    Parse {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The ONNX Runtime rejected the classifier model.
    #[error("failed to load classifier from {path}: {message}")]
    Classifier { path: PathBuf, message: String },

    /// The artifact declares a format version this build cannot read.
    #[error("{artifact} artifact has unsupported format_version {found} (supported: {supported})")]
    UnsupportedVersion {
        artifact: &'static str,
        found: u32,
        supported: u32,
    },

    /// The artifact parsed but does not fit this pipeline.
    #[error("{artifact} artifact schema mismatch: {reason}")]
    Schema {
        artifact: &'static str,
        reason: String,
    },
}

/// Out-of-range form input, rejected before it reaches the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field} must be {rule} (got {value})")]
pub struct ValidationError {
    pub field: &'static str,
    pub rule: &'static str,
    pub value: String,
}

/// The fitted encoder refused a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    /// A categorical value the encoder was not fitted on, under the
    /// `error` unknown-category policy.
    #[error("unknown category {value:?} for column {column}")]
    UnknownCategory { column: String, value: String },
}

/// Failure while producing a prediction for one record.
#[derive(Error, Debug)]
pub enum PredictError {
    /// The record was rejected by the alignment pipeline.
    #[error("record rejected: {0}")]
    Rejected(#[from] AlignmentError),

    /// The aligned vector width differs from the trained feature count.
    #[error("feature vector has {actual} columns, classifier expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The classifier output carries no probability for the positive class.
    #[error("classifier output has no probability for class {class}")]
    MissingPositiveClass { class: i64 },

    /// The classifier produced a probability outside [0, 1].
    #[error("classifier produced probability {0} outside [0, 1]")]
    InvalidProbability(f64),

    /// The classifier runtime failed.
    #[error("classifier {model} failed: {message}")]
    Classifier { model: String, message: String },
}

impl PredictError {
    /// True for pipeline or model faults, false for records the caller
    /// can correct.
    pub fn is_internal(&self) -> bool {
        !matches!(self, PredictError::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_is_not_internal() {
        let err = PredictError::from(AlignmentError::UnknownCategory {
            column: "job".to_string(),
            value: "astronaut".to_string(),
        });
        assert!(!err.is_internal());
        assert_eq!(
            err.to_string(),
            "record rejected: unknown category \"astronaut\" for column job"
        );
    }

    #[test]
    fn test_shape_mismatch_is_internal() {
        let err = PredictError::ShapeMismatch {
            expected: 51,
            actual: 50,
        };
        assert!(err.is_internal());
    }

    #[test]
    fn test_validation_message() {
        let err = ValidationError {
            field: "day",
            rule: "between 1 and 31",
            value: "0".to_string(),
        };
        assert_eq!(err.to_string(), "day must be between 1 and 31 (got 0)");
    }
}
