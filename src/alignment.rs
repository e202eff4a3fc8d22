//! Feature alignment: input record -> classifier feature vector.
//!
//! The pipeline mirrors the preprocessing done when the classifier was
//! trained:
//!
//! 1. yes/no answers become 0/1,
//! 2. the six categorical columns go through the fitted one-hot encoder,
//! 3. the encoded columns are concatenated with the untouched numeric ones,
//! 4. the result is reindexed by name to the trained feature list (missing
//!    columns filled with 0, extra columns dropped).
//!
//! Step 4 is resolved once, when the aligner is built, into a plan that
//! maps every trained feature to its source column. Per-record alignment
//! only evaluates that plan, so the output width and order never depend on
//! the record.

use crate::error::AlignmentError;
use crate::models::encoder::OneHotEncoder;
use crate::types::record::{InputRecord, NumericColumn};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Where a trained feature's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Numeric(usize),
    OneHot(usize),
    /// Not produced by this pipeline; always 0
    Missing,
}

/// Numeric columns followed by one-hot columns, before reindexing
#[derive(Debug, Clone)]
pub struct EncodedFeatures<'a> {
    numeric: [f32; NumericColumn::ALL.len()],
    one_hot: Vec<f32>,
    one_hot_names: &'a [String],
}

impl EncodedFeatures<'_> {
    /// Named columns in concatenation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        let numeric = NumericColumn::ALL
            .iter()
            .map(|c| c.name())
            .zip(self.numeric.iter().copied());
        let one_hot = self
            .one_hot_names
            .iter()
            .map(String::as_str)
            .zip(self.one_hot.iter().copied());
        numeric.chain(one_hot)
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.one_hot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, source: Source) -> f32 {
        match source {
            Source::Numeric(i) => self.numeric[i],
            Source::OneHot(i) => self.one_hot[i],
            Source::Missing => 0.0,
        }
    }
}

/// Feature vector in the classifier's trained column order
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatures {
    names: Arc<[String]>,
    values: Vec<f32>,
}

impl AlignedFeatures {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Value of a trained feature by name
    pub fn get(&self, name: &str) -> Option<f32> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Transforms input records into classifier-ready feature vectors.
pub struct FeatureAligner {
    encoder: OneHotEncoder,
    features: Arc<[String]>,
    plan: Vec<Source>,
}

impl FeatureAligner {
    /// Build the aligner for a fitted encoder and trained feature list.
    pub fn new(encoder: OneHotEncoder, features: Vec<String>) -> Self {
        let mut sources: HashMap<&str, Source> = HashMap::new();
        for (i, column) in NumericColumn::ALL.iter().enumerate() {
            sources.entry(column.name()).or_insert(Source::Numeric(i));
        }
        for (i, name) in encoder.feature_names_out().iter().enumerate() {
            sources.entry(name.as_str()).or_insert(Source::OneHot(i));
        }

        let plan: Vec<Source> = features
            .iter()
            .map(|f| sources.get(f.as_str()).copied().unwrap_or(Source::Missing))
            .collect();

        let aligner = Self {
            encoder,
            features: features.into(),
            plan,
        };

        let missing = aligner.unmatched_features();
        if !missing.is_empty() {
            warn!(
                features = ?missing,
                "Trained features not produced by the pipeline; they will always be 0"
            );
        }

        aligner
    }

    /// Number of features the classifier was trained on.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Trained features the pipeline never produces
    pub fn unmatched_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .zip(&self.plan)
            .filter(|(_, s)| **s == Source::Missing)
            .map(|(f, _)| f.as_str())
            .collect()
    }

    /// Steps 1-3: coerce yes/no, one-hot encode, concatenate.
    pub fn encode(&self, record: &InputRecord) -> Result<EncodedFeatures<'_>, AlignmentError> {
        let numeric = NumericColumn::ALL.map(|c| record.numeric_value(c));
        let one_hot = self.encoder.transform(&record.categorical_values())?;

        Ok(EncodedFeatures {
            numeric,
            one_hot,
            one_hot_names: self.encoder.feature_names_out(),
        })
    }

    /// Step 4: reorder to the trained feature list.
    pub fn reindex(&self, encoded: &EncodedFeatures<'_>) -> AlignedFeatures {
        AlignedFeatures {
            names: Arc::clone(&self.features),
            values: self.plan.iter().map(|&s| encoded.value(s)).collect(),
        }
    }

    /// Full pipeline for one record.
    pub fn align(&self, record: &InputRecord) -> Result<AlignedFeatures, AlignmentError> {
        let encoded = self.encode(record)?;
        Ok(self.reindex(&encoded))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::encoder::test_support::bank_encoder;
    use crate::models::encoder::UnknownCategoryPolicy;
    use crate::types::record::{Contact, Education, Job, Marital, Month, Poutcome, YesNo};

    fn scenario() -> InputRecord {
        InputRecord {
            age: 40,
            job: Job::Management,
            marital: Marital::Married,
            education: Education::Tertiary,
            default: YesNo::No,
            balance: 2000.0,
            housing: YesNo::Yes,
            loan: YesNo::No,
            contact: Contact::Cellular,
            day: 15,
            month: Month::May,
            campaign: 3,
            pdays: -1,
            previous: 0,
            poutcome: Poutcome::Unknown,
        }
    }

    #[test]
    fn test_scenario_vector() {
        let aligner = bank_aligner(UnknownCategoryPolicy::Error);
        let aligned = aligner.align(&scenario()).unwrap();

        assert_eq!(aligned.len(), 9 + 38);
        assert_eq!(aligned.names(), aligner.feature_names());

        assert_eq!(aligned.get("age"), Some(40.0));
        assert_eq!(aligned.get("default"), Some(0.0));
        assert_eq!(aligned.get("balance"), Some(2000.0));
        assert_eq!(aligned.get("housing"), Some(1.0));
        assert_eq!(aligned.get("loan"), Some(0.0));
        assert_eq!(aligned.get("day"), Some(15.0));
        assert_eq!(aligned.get("campaign"), Some(3.0));
        assert_eq!(aligned.get("pdays"), Some(-1.0));
        assert_eq!(aligned.get("previous"), Some(0.0));

        let expected_hot = [
            "job_management",
            "marital_married",
            "education_tertiary",
            "contact_cellular",
            "month_may",
            "poutcome_unknown",
        ];
        for (name, value) in aligned.names().iter().zip(aligned.as_slice()).skip(9) {
            let want = if expected_hot.contains(&name.as_str()) { 1.0 } else { 0.0 };
            assert_eq!(*value, want, "column {name}");
        }
    }

    #[test]
    fn test_constant_shape_for_every_category() {
        let aligner = bank_aligner(UnknownCategoryPolicy::Error);
        let width = aligner.feature_count();

        for &job in Job::ALL {
            for &month in Month::ALL {
                for &contact in Contact::ALL {
                    let record = InputRecord {
                        job,
                        month,
                        contact,
                        ..scenario()
                    };
                    let aligned = aligner.align(&record).unwrap();
                    assert_eq!(aligned.len(), width);
                    assert_eq!(aligned.names(), aligner.feature_names());
                }
            }
        }
        for &marital in Marital::ALL {
            for &education in Education::ALL {
                for &poutcome in Poutcome::ALL {
                    let record = InputRecord {
                        marital,
                        education,
                        poutcome,
                        ..scenario()
                    };
                    assert_eq!(aligner.align(&record).unwrap().len(), width);
                }
            }
        }
    }

    #[test]
    fn test_alignment_is_deterministic() {
        let aligner = bank_aligner(UnknownCategoryPolicy::Error);
        let first = aligner.align(&scenario()).unwrap();
        for _ in 0..10 {
            assert_eq!(aligner.align(&scenario()).unwrap(), first);
        }
    }

    #[test]
    fn test_yes_no_coercion() {
        let aligner = bank_aligner(UnknownCategoryPolicy::Error);
        let record = InputRecord {
            default: YesNo::Yes,
            housing: YesNo::No,
            loan: YesNo::Yes,
            ..scenario()
        };
        let aligned = aligner.align(&record).unwrap();
        assert_eq!(aligned.get("default"), Some(1.0));
        assert_eq!(aligned.get("housing"), Some(0.0));
        assert_eq!(aligned.get("loan"), Some(1.0));
    }

    #[test]
    fn test_reindex_fills_missing_with_zero_and_drops_extra() {
        let features: Vec<String> = ["month_may", "duration", "age", "job_management", "never_seen"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let aligner = FeatureAligner::new(bank_encoder(UnknownCategoryPolicy::Error), features);

        let aligned = aligner.align(&scenario()).unwrap();
        assert_eq!(aligned.as_slice(), &[1.0_f32, 0.0, 40.0, 1.0, 0.0]);
        assert_eq!(aligner.unmatched_features(), vec!["duration", "never_seen"]);
    }

    #[test]
    fn test_encoded_features_concatenation_order() {
        let aligner = bank_aligner(UnknownCategoryPolicy::Error);
        let encoded = aligner.encode(&scenario()).unwrap();

        assert_eq!(encoded.len(), 9 + 38);
        let names: Vec<&str> = encoded.iter().map(|(n, _)| n).collect();
        assert_eq!(&names[..3], &["age", "default", "balance"]);
        assert_eq!(names[9], "job_admin.");
    }

    #[test]
    fn test_untrained_job_with_ignore_policy() {
        // Encoder fitted without the "student" category
        let mut export = crate::models::encoder::test_support::bank_export(UnknownCategoryPolicy::Ignore);
        export.categories[0].retain(|c| c != "student");
        let encoder = OneHotEncoder::from_export(export).unwrap();
        let features: Vec<String> = encoder.feature_names_out().to_vec();
        let aligner = FeatureAligner::new(encoder, features);

        let record = InputRecord {
            job: Job::Student,
            ..scenario()
        };
        let aligned = aligner.align(&record).unwrap();
        assert_eq!(aligned.len(), 11 + 3 + 4 + 3 + 12 + 4);
        assert!(aligned.as_slice()[..11].iter().all(|&v| v == 0.0));
        assert_eq!(aligned.get("marital_married"), Some(1.0));
    }

    #[test]
    fn test_untrained_job_with_error_policy() {
        let mut export = crate::models::encoder::test_support::bank_export(UnknownCategoryPolicy::Error);
        export.categories[0].retain(|c| c != "student");
        let encoder = OneHotEncoder::from_export(export).unwrap();
        let features: Vec<String> = encoder.feature_names_out().to_vec();
        let aligner = FeatureAligner::new(encoder, features);

        let record = InputRecord {
            job: Job::Student,
            ..scenario()
        };
        assert_eq!(
            aligner.align(&record).unwrap_err(),
            AlignmentError::UnknownCategory {
                column: "job".to_string(),
                value: "student".to_string()
            }
        );
    }
}
