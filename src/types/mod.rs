//! Type definitions for the predictor

pub mod prediction;
pub mod record;

pub use prediction::{InsightThresholds, Label, Prediction, PredictionInsight, PredictionResponse};
pub use record::{InputRecord, NumericColumn, YesNo, CATEGORICAL_COLUMNS};
