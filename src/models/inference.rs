//! Inference engine: aligned features -> subscription prediction

use crate::alignment::{AlignedFeatures, FeatureAligner};
use crate::config::PredictionConfig;
use crate::error::PredictError;
use crate::models::classifier::Classifier;
use crate::models::loader::Artifacts;
use crate::types::prediction::{Label, Prediction};
use crate::types::record::InputRecord;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the alignment pipeline and the classifier for one record at a time.
///
/// Everything inside is read-only after construction, so one engine is
/// shared by all request handlers.
pub struct InferenceEngine {
    aligner: FeatureAligner,
    classifier: Arc<dyn Classifier>,
    /// Class id of "subscribe"
    positive_class: i64,
    /// Probability above which the label is subscribe
    decision_threshold: f64,
}

impl InferenceEngine {
    /// Create an inference engine from loaded artifacts
    pub fn new(artifacts: Artifacts, config: &PredictionConfig) -> Self {
        let Artifacts {
            classifier,
            encoder,
            features,
        } = artifacts;

        let engine = Self::with_parts(FeatureAligner::new(encoder, features), classifier, config);

        info!(
            classifier = %engine.classifier.name(),
            features = engine.aligner.feature_count(),
            positive_class = engine.positive_class,
            decision_threshold = engine.decision_threshold,
            "Inference engine initialized"
        );

        engine
    }

    /// Create an inference engine around an existing aligner and classifier
    pub fn with_parts(aligner: FeatureAligner, classifier: Arc<dyn Classifier>, config: &PredictionConfig) -> Self {
        Self {
            aligner,
            classifier,
            positive_class: config.positive_class,
            decision_threshold: config.decision_threshold,
        }
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    /// Align a record and predict on it.
    pub fn predict(&self, record: &InputRecord) -> Result<Prediction, PredictError> {
        let features = self.aligner.align(record)?;
        self.predict_aligned(&features)
    }

    /// Predict on an already aligned feature vector.
    pub fn predict_aligned(&self, features: &AlignedFeatures) -> Result<Prediction, PredictError> {
        self.predict_slice(features.as_slice())
    }

    fn predict_slice(&self, features: &[f32]) -> Result<Prediction, PredictError> {
        let expected = self
            .classifier
            .input_width()
            .unwrap_or_else(|| self.aligner.feature_count());
        if features.len() != expected {
            return Err(PredictError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }

        let scores = self
            .classifier
            .classify(features)
            .map_err(|e| PredictError::Classifier {
                model: self.classifier.name().to_string(),
                message: format!("{e:#}"),
            })?;

        let probability = scores
            .probability_of(self.positive_class)
            .ok_or(PredictError::MissingPositiveClass {
                class: self.positive_class,
            })?;

        if !(0.0..=1.0).contains(&probability) {
            return Err(PredictError::InvalidProbability(probability));
        }

        let label = if probability > self.decision_threshold {
            Label::Subscribe
        } else {
            Label::NotSubscribe
        };

        if let Some(model_label) = scores.label {
            if (model_label == self.positive_class) != label.is_subscribe() {
                warn!(
                    model = %self.classifier.name(),
                    model_label = model_label,
                    probability = probability,
                    decision_threshold = self.decision_threshold,
                    "Model label disagrees with thresholded probability"
                );
            }
        }

        debug!(label = label.as_str(), probability = probability, "Prediction complete");

        Ok(Prediction { label, probability })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::alignment::test_support::bank_aligner;
    use crate::models::classifier::ClassScores;
    use crate::models::encoder::UnknownCategoryPolicy;
    use crate::types::record::Job;

    fn engine(classifier: Arc<dyn Classifier>) -> InferenceEngine {
        InferenceEngine::with_parts(
            bank_aligner(UnknownCategoryPolicy::Error),
            classifier,
            &PredictionConfig::default(),
        )
    }

    #[test]
    fn test_label_follows_threshold() {
        for (p, label) in [
            (0.0, Label::NotSubscribe),
            (0.3, Label::NotSubscribe),
            (0.5, Label::NotSubscribe),
            (0.51, Label::Subscribe),
            (1.0, Label::Subscribe),
        ] {
            let engine = engine(Arc::new(FixedClassifier { probability: p }));
            let prediction = engine.predict(&InputRecord::default()).unwrap();
            assert_eq!(prediction.label, label, "probability {p}");
            assert_eq!(prediction.probability, p);
        }
    }

    #[test]
    fn test_positive_class_found_by_id_not_position() {
        let engine = engine(Arc::new(ScriptedClassifier {
            scores: ClassScores {
                label: Some(1),
                probabilities: vec![(1, 0.8), (0, 0.2)],
            },
        }));
        let prediction = engine.predict(&InputRecord::default()).unwrap();
        assert_eq!(prediction.probability, 0.8);
        assert_eq!(prediction.label, Label::Subscribe);
    }

    #[test]
    fn test_missing_positive_class_is_internal() {
        let engine = engine(Arc::new(ScriptedClassifier {
            scores: ClassScores {
                label: None,
                probabilities: vec![(0, 1.0)],
            },
        }));
        let err = engine.predict(&InputRecord::default()).unwrap_err();
        assert!(matches!(err, PredictError::MissingPositiveClass { class: 1 }));
        assert!(err.is_internal());
    }

    #[test]
    fn test_invalid_probability_is_internal() {
        let engine = engine(Arc::new(ScriptedClassifier {
            scores: ClassScores {
                label: None,
                probabilities: vec![(0, -0.2), (1, 1.2)],
            },
        }));
        let err = engine.predict(&InputRecord::default()).unwrap_err();
        assert!(matches!(err, PredictError::InvalidProbability(_)));
    }

    #[test]
    fn test_shape_mismatch_is_internal() {
        let engine = engine(Arc::new(FixedClassifier { probability: 0.9 }));
        let err = engine.predict_slice(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 47,
                actual: 3
            }
        ));
        assert!(err.is_internal());
    }

    #[test]
    fn test_shape_checked_against_classifier_input() {
        let engine = engine(Arc::new(SizedClassifier {
            input_width: Some(50),
            class_count: Some(2),
        }));
        let err = engine.predict(&InputRecord::default()).unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 50,
                actual: 47
            }
        ));

        let engine = engine_with_width(47);
        assert!(engine.predict(&InputRecord::default()).is_ok());
    }

    fn engine_with_width(width: usize) -> InferenceEngine {
        engine(Arc::new(SizedClassifier {
            input_width: Some(width),
            class_count: None,
        }))
    }

    #[test]
    fn test_classifier_failure_is_internal() {
        let engine = engine(Arc::new(FailingClassifier));
        let err = engine.predict(&InputRecord::default()).unwrap_err();
        match &err {
            PredictError::Classifier { model, message } => {
                assert_eq!(model, "failing");
                assert!(message.contains("width 47"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.is_internal());
    }

    #[test]
    fn test_unknown_category_rejected_not_internal() {
        let mut export = crate::models::encoder::test_support::bank_export(UnknownCategoryPolicy::Error);
        export.categories[0].retain(|c| c != "housemaid");
        let encoder = crate::models::encoder::OneHotEncoder::from_export(export).unwrap();
        let features = encoder.feature_names_out().to_vec();
        let engine = InferenceEngine::with_parts(
            FeatureAligner::new(encoder, features),
            Arc::new(FixedClassifier { probability: 0.9 }),
            &PredictionConfig::default(),
        );

        let record = InputRecord {
            job: Job::Housemaid,
            ..InputRecord::default()
        };
        let err = engine.predict(&record).unwrap_err();
        assert!(matches!(err, PredictError::Rejected(_)));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let engine = Arc::new(engine(Arc::new(FixedClassifier { probability: 0.7 })));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.predict(&InputRecord::default()).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().label, Label::Subscribe);
        }
    }
}
