//! Boot-time loader for the trained artifacts
//!
//! Loads the classifier (ONNX), the fitted encoder and the trained feature
//! list once at startup. Any failure here is fatal: the service has no
//! degraded mode without its artifacts.

use crate::config::ArtifactsConfig;
use crate::error::ArtifactError;
use crate::models::classifier::{Classifier, OnnxClassifier};
use crate::models::encoder::{EncoderExport, OneHotEncoder};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::ValueType;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Feature list format this build reads.
pub const FEATURES_FORMAT_VERSION: u32 = 1;

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for class probabilities
    pub probability_output: String,
    /// Output name for the predicted label, if the model has one
    pub label_output: Option<String>,
    /// Fixed feature dimension of the input, when the model declares one
    pub input_width: Option<usize>,
    /// Fixed class dimension of a tensor probability output
    pub class_count: Option<usize>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self, ort::Error> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model(&self, path: &Path, name: &str) -> Result<LoadedModel, ort::Error> {
        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let input_width = session
            .inputs
            .first()
            .and_then(|i| fixed_dim(&i.input_type, 1));

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        let class_count = session
            .outputs
            .iter()
            .find(|o| o.name == probability_output)
            .and_then(|o| fixed_dim(&o.output_type, 1));

        info!(
            model = %name,
            input = %input_name,
            input_width = ?input_width,
            probabilities = %probability_output,
            class_count = ?class_count,
            label = ?label_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            probability_output,
            label_output,
            input_width,
            class_count,
        })
    }
}

/// Size of a tensor axis, `None` when the value is not a tensor or the axis
/// is dynamic
fn fixed_dim(value_type: &ValueType, axis: usize) -> Option<usize> {
    let shape = value_type.tensor_shape()?;
    let dim = *shape.get(axis)?;
    (dim > 0).then_some(dim as usize)
}

/// The three trained artifacts, immutable for the life of the process
pub struct Artifacts {
    pub classifier: Arc<dyn Classifier>,
    pub encoder: OneHotEncoder,
    /// Column order the classifier was trained on
    pub features: Vec<String>,
}

/// On-disk feature list: a bare array or a versioned object
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureListExport {
    Bare(Vec<String>),
    Versioned {
        format_version: u32,
        features: Vec<String>,
    },
}

/// Loads and verifies every artifact named in the configuration
pub struct ArtifactLoader<'a> {
    config: &'a ArtifactsConfig,
}

impl<'a> ArtifactLoader<'a> {
    pub fn new(config: &'a ArtifactsConfig) -> Self {
        Self { config }
    }

    /// Load all three artifacts.
    pub fn load(&self) -> Result<Artifacts, ArtifactError> {
        let encoder = load_encoder(&self.config.encoder_path())?;
        let features = load_features(&self.config.features_path())?;
        let classifier = self.load_classifier()?;
        check_classifier(classifier.as_ref(), features.len(), &self.config.class_ids)?;

        info!(
            classifier = %classifier.name(),
            encoded_columns = encoder.width(),
            features = features.len(),
            unknown_category_policy = ?encoder.policy(),
            "Artifacts loaded"
        );

        Ok(Artifacts {
            classifier,
            encoder,
            features,
        })
    }

    fn load_classifier(&self) -> Result<Arc<dyn Classifier>, ArtifactError> {
        let path = self.config.classifier_path();
        if !path.is_file() {
            return Err(ArtifactError::Io {
                artifact: "classifier",
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                path,
            });
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("classifier")
            .to_string();

        let model = ModelLoader::with_threads(self.config.onnx_threads)
            .and_then(|loader| loader.load_model(&path, &name))
            .map_err(|e| ArtifactError::Classifier {
                path: path.clone(),
                message: e.to_string(),
            })?;

        Ok(Arc::new(OnnxClassifier::new(model, self.config.class_ids.clone())))
    }
}

/// Verify the classifier's declared dimensions against the trained feature
/// list and the configured class ids. Dynamic dimensions pass.
pub fn check_classifier(classifier: &dyn Classifier, features: usize, class_ids: &[i64]) -> Result<(), ArtifactError> {
    if let Some(width) = classifier.input_width() {
        if width != features {
            return Err(ArtifactError::Schema {
                artifact: "classifier",
                reason: format!(
                    "model {} expects {} input features, trained feature list has {}",
                    classifier.name(),
                    width,
                    features
                ),
            });
        }
    }

    if let Some(classes) = classifier.class_count() {
        if classes != class_ids.len() {
            return Err(ArtifactError::Schema {
                artifact: "classifier",
                reason: format!(
                    "model {} outputs {} class probabilities, configured class ids {:?}",
                    classifier.name(),
                    classes,
                    class_ids
                ),
            });
        }
    }

    Ok(())
}

/// Load and verify the fitted encoder export.
pub fn load_encoder(path: &Path) -> Result<OneHotEncoder, ArtifactError> {
    let export: EncoderExport = read_json("encoder", path)?;
    OneHotEncoder::from_export(export)
}

/// Load and verify the trained feature list.
pub fn load_features(path: &Path) -> Result<Vec<String>, ArtifactError> {
    let features = match read_json("features", path)? {
        FeatureListExport::Bare(features) => features,
        FeatureListExport::Versioned {
            format_version,
            features,
        } => {
            if format_version != FEATURES_FORMAT_VERSION {
                return Err(ArtifactError::UnsupportedVersion {
                    artifact: "features",
                    found: format_version,
                    supported: FEATURES_FORMAT_VERSION,
                });
            }
            features
        }
    };

    if features.is_empty() {
        return Err(ArtifactError::Schema {
            artifact: "features",
            reason: "feature list is empty".to_string(),
        });
    }

    let mut seen = HashSet::new();
    if let Some(dup) = features.iter().find(|f| !seen.insert(f.as_str())) {
        return Err(ArtifactError::Schema {
            artifact: "features",
            reason: format!("feature {dup:?} listed twice"),
        });
    }

    Ok(features)
}

fn read_json<T: DeserializeOwned>(artifact: &'static str, path: &Path) -> Result<T, ArtifactError> {
    let to_path = || PathBuf::from(path);
    let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        artifact,
        path: to_path(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
        artifact,
        path: to_path(),
        source,
    })
}
