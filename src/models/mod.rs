//! Trained artifacts and inference

pub mod classifier;
pub mod encoder;
pub mod inference;
pub mod loader;

pub use classifier::{ClassScores, Classifier, OnnxClassifier};
pub use encoder::{OneHotEncoder, UnknownCategoryPolicy};
pub use inference::InferenceEngine;
pub use loader::{ArtifactLoader, Artifacts};
