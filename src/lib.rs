//! Bank Marketing Subscription Predictor
//!
//! Loads a trained classifier together with its fitted one-hot encoder and
//! trained feature list, aligns customer records to the classifier's input
//! layout and serves subscribe / not-subscribe predictions over HTTP.

pub mod alignment;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use alignment::{AlignedFeatures, FeatureAligner};
pub use config::AppConfig;
pub use error::{AlignmentError, ArtifactError, PredictError, ValidationError};
pub use models::inference::InferenceEngine;
pub use models::loader::{ArtifactLoader, Artifacts};
pub use types::{InputRecord, Label, Prediction, PredictionResponse};
