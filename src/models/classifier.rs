//! Classifier seam and its ONNX Runtime implementation

use crate::models::loader::LoadedModel;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::sync::Mutex;
use tracing::debug;

/// Per-class output of one classifier run
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    /// Class the model itself predicts, when the model exposes it
    pub label: Option<i64>,
    /// (class id, probability) pairs
    pub probabilities: Vec<(i64, f64)>,
}

impl ClassScores {
    /// Probability for a class, looked up by class id.
    pub fn probability_of(&self, class: i64) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|(id, _)| *id == class)
            .map(|(_, p)| *p)
    }
}

/// A trained binary classifier.
///
/// Implementations must be usable from many request handlers at once.
pub trait Classifier: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Run the model on one feature row.
    fn classify(&self, features: &[f32]) -> Result<ClassScores>;

    /// Feature count the model declares for its input, if fixed
    fn input_width(&self) -> Option<usize> {
        None
    }

    /// Class count the model declares for its probability output, if fixed
    fn class_count(&self) -> Option<usize> {
        None
    }
}

/// Tree-ensemble classifier exported to ONNX
pub struct OnnxClassifier {
    name: String,
    /// ONNX Runtime runs need exclusive access to the session
    model: Mutex<LoadedModel>,
    /// Class ids in the column order of a probability tensor
    class_ids: Vec<i64>,
    input_width: Option<usize>,
    class_count: Option<usize>,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel, class_ids: Vec<i64>) -> Self {
        Self {
            name: model.name.clone(),
            input_width: model.input_width,
            class_count: model.class_count,
            model: Mutex::new(model),
            class_ids,
        }
    }

    /// Extract per-class probabilities from model output.
    /// Handles tensor outputs (zipmap disabled) and seq(map) outputs (zipmap enabled).
    fn extract_probabilities(&self, outputs: &ort::session::SessionOutputs, output_name: &str) -> Result<Vec<(i64, f64)>> {
        if let Some(output) = outputs.get(output_name) {
            let dtype = output.dtype();

            if let Ok(tensor) = output.try_extract_tensor::<f32>() {
                let (shape, data) = tensor;
                let dims: Vec<i64> = shape.iter().copied().collect();
                return probabilities_from_tensor(&dims, data, &self.class_ids);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                return self.probabilities_from_sequence_map(output);
            }
        }

        // Fallback: first non-label output that yields probabilities
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }

            let dtype = output.dtype();

            if let Ok(tensor) = output.try_extract_tensor::<f32>() {
                let (shape, data) = tensor;
                let dims: Vec<i64> = shape.iter().copied().collect();
                debug!(model = %self.name, output = %name, "Extracted probabilities from fallback output");
                return probabilities_from_tensor(&dims, data, &self.class_ids);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(probabilities) = self.probabilities_from_sequence_map(&output) {
                    return Ok(probabilities);
                }
            }
        }

        anyhow::bail!("no probability output found")
    }

    /// Probabilities from seq(map(int64, float)), class ids taken from the map keys
    fn probabilities_from_sequence_map(&self, output: &ort::value::DynValue) -> Result<Vec<(i64, f64)>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        // batch size is always 1
        let map_value = maps.first().context("Empty probability sequence")?;
        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        Ok(kv_pairs.into_iter().map(|(class, p)| (class, p as f64)).collect())
    }

    fn extract_label(outputs: &ort::session::SessionOutputs, label_output: Option<&str>) -> Option<i64> {
        let output = outputs.get(label_output?)?;
        let (_, data) = output.try_extract_tensor::<i64>().ok()?;
        data.first().copied()
    }
}

/// Map a [batch, classes] or [classes] probability tensor to class ids,
/// column `i` belonging to `class_ids[i]`.
pub(crate) fn probabilities_from_tensor(dims: &[i64], data: &[f32], class_ids: &[i64]) -> Result<Vec<(i64, f64)>> {
    let num_classes = match dims {
        [_, classes] | [classes] => *classes as usize,
        _ => anyhow::bail!("unexpected probability tensor shape {:?}", dims),
    };

    if num_classes != class_ids.len() || data.len() < num_classes {
        anyhow::bail!(
            "probability tensor has {} classes, configured class ids {:?}",
            num_classes,
            class_ids
        );
    }

    Ok(class_ids
        .iter()
        .zip(&data[..num_classes])
        .map(|(&class, &p)| (class, p as f64))
        .collect())
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_width(&self) -> Option<usize> {
        self.input_width
    }

    fn class_count(&self) -> Option<usize> {
        self.class_count
    }

    fn classify(&self, features: &[f32]) -> Result<ClassScores> {
        use ort::value::Tensor;

        // shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec())).context("Failed to create input tensor")?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let LoadedModel {
            session,
            input_name,
            probability_output,
            label_output,
            ..
        } = &mut *model;

        let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;

        let probabilities = self.extract_probabilities(&outputs, probability_output)?;
        let label = Self::extract_label(&outputs, label_output.as_deref());

        debug!(model = %self.name, label = ?label, probabilities = ?probabilities, "Classifier run complete");

        Ok(ClassScores { label, probabilities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_lookup_by_class_id() {
        let scores = ClassScores {
            label: Some(0),
            probabilities: vec![(1, 0.3), (0, 0.7)],
        };
        assert_eq!(scores.probability_of(1), Some(0.3));
        assert_eq!(scores.probability_of(0), Some(0.7));
        assert_eq!(scores.probability_of(2), None);
    }

    #[test]
    fn test_tensor_columns_follow_class_ids() {
        let probabilities = probabilities_from_tensor(&[1, 2], &[0.25, 0.75], &[1, 0]).unwrap();
        assert_eq!(probabilities, vec![(1, 0.25), (0, 0.75)]);

        let scores = ClassScores {
            label: None,
            probabilities,
        };
        assert_eq!(scores.probability_of(1), Some(0.25));
    }

    #[test]
    fn test_flat_tensor_accepted() {
        let probabilities = probabilities_from_tensor(&[2], &[0.5, 0.5], &[0, 1]).unwrap();
        assert_eq!(probabilities, vec![(0, 0.5), (1, 0.5)]);
    }

    #[test]
    fn test_tensor_class_count_mismatch() {
        let err = probabilities_from_tensor(&[1, 3], &[0.2, 0.3, 0.5], &[0, 1]).unwrap_err();
        assert!(err.to_string().contains("3 classes"));
    }

    #[test]
    fn test_tensor_short_data_rejected() {
        assert!(probabilities_from_tensor(&[1, 2], &[0.4], &[0, 1]).is_err());
    }

    #[test]
    fn test_tensor_unexpected_rank() {
        let err = probabilities_from_tensor(&[1, 1, 2], &[0.4, 0.6], &[0, 1]).unwrap_err();
        assert!(err.to_string().contains("unexpected probability tensor shape"));
    }
}
