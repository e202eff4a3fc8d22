//! Fitted one-hot encoder for the categorical columns
//!
//! The encoder is fitted elsewhere and exported as JSON (fitted categories
//! per column plus the unknown-category policy). Loading it fixes the
//! ordered list of (column, category) output columns for the life of the
//! process; nothing here ever refits.

use crate::error::{AlignmentError, ArtifactError};
use crate::types::record::CATEGORICAL_COLUMNS;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Encoder export format this build reads.
pub const ENCODER_FORMAT_VERSION: u32 = 1;

const ARTIFACT: &str = "encoder";

/// What to do with a category the encoder was not fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Reject the record.
    #[default]
    Error,
    /// Encode the column as all zeros.
    Ignore,
}

/// On-disk shape of a fitted encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderExport {
    pub format_version: u32,
    /// Input columns, in the order the encoder was fitted on
    pub columns: Vec<String>,
    /// Fitted categories per column, in output order
    pub categories: Vec<Vec<String>>,
    #[serde(default)]
    pub handle_unknown: UnknownCategoryPolicy,
    /// Per-column category dropped from the output, if any
    #[serde(default)]
    pub drop: Option<Vec<Option<String>>>,
}

/// Output block of one input column.
#[derive(Debug, Clone)]
struct ColumnBlock {
    column: String,
    /// Position of the block's first output column
    offset: usize,
    /// Category -> position within the block; dropped category absent
    positions: HashMap<String, usize>,
    dropped: Option<String>,
}

/// Fitted one-hot encoder
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    blocks: Vec<ColumnBlock>,
    policy: UnknownCategoryPolicy,
    feature_names: Vec<String>,
}

impl OneHotEncoder {
    /// Build the encoder from its export, verifying it matches the
    /// categorical columns of [`crate::types::InputRecord`].
    pub fn from_export(export: EncoderExport) -> Result<Self, ArtifactError> {
        if export.format_version != ENCODER_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                artifact: ARTIFACT,
                found: export.format_version,
                supported: ENCODER_FORMAT_VERSION,
            });
        }

        if export.columns != CATEGORICAL_COLUMNS {
            return Err(schema(format!(
                "expected input columns {:?}, found {:?}",
                CATEGORICAL_COLUMNS, export.columns
            )));
        }

        if export.categories.len() != export.columns.len() {
            return Err(schema(format!(
                "{} category lists for {} columns",
                export.categories.len(),
                export.columns.len()
            )));
        }

        let drops = match export.drop {
            Some(drops) if drops.len() != export.columns.len() => {
                return Err(schema(format!(
                    "{} drop entries for {} columns",
                    drops.len(),
                    export.columns.len()
                )));
            }
            Some(drops) => drops,
            None => vec![None; export.columns.len()],
        };

        let mut blocks = Vec::with_capacity(export.columns.len());
        let mut feature_names = Vec::new();

        for ((column, categories), dropped) in export.columns.into_iter().zip(export.categories).zip(drops) {
            if categories.is_empty() {
                return Err(schema(format!("column {column} has no categories")));
            }

            let mut seen = HashSet::new();
            if let Some(dup) = categories.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(schema(format!("column {column} lists category {dup:?} twice")));
            }

            if let Some(ref d) = dropped {
                if !seen.contains(d.as_str()) {
                    return Err(schema(format!(
                        "column {column} drops {d:?}, which is not a fitted category"
                    )));
                }
            }

            let offset = feature_names.len();
            let mut positions = HashMap::with_capacity(categories.len());
            for category in categories {
                if dropped.as_deref() == Some(category.as_str()) {
                    continue;
                }
                positions.insert(category.clone(), feature_names.len() - offset);
                feature_names.push(format!("{column}_{category}"));
            }

            blocks.push(ColumnBlock {
                column,
                offset,
                positions,
                dropped,
            });
        }

        Ok(Self {
            blocks,
            policy: export.handle_unknown,
            feature_names,
        })
    }

    /// Output column names, `<column>_<category>`, in output order.
    pub fn feature_names_out(&self) -> &[String] {
        &self.feature_names
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    /// One-hot encode the categorical values, given in
    /// [`CATEGORICAL_COLUMNS`] order.
    pub fn transform(&self, values: &[&str]) -> Result<Vec<f32>, AlignmentError> {
        debug_assert_eq!(values.len(), self.blocks.len());

        let mut encoded = vec![0.0; self.width()];
        for (block, value) in self.blocks.iter().zip(values) {
            match block.positions.get(*value) {
                Some(&position) => encoded[block.offset + position] = 1.0,
                None if block.dropped.as_deref() == Some(*value) => {}
                None => match self.policy {
                    UnknownCategoryPolicy::Ignore => {}
                    UnknownCategoryPolicy::Error => {
                        return Err(AlignmentError::UnknownCategory {
                            column: block.column.clone(),
                            value: value.to_string(),
                        });
                    }
                },
            }
        }
        Ok(encoded)
    }
}

fn schema(reason: String) -> ArtifactError {
    ArtifactError::Schema {
        artifact: ARTIFACT,
        reason,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const SCENARIO: [&str; 6] = ["management", "married", "tertiary", "cellular", "may", "unknown"];

    #[test]
    fn test_feature_names_out() {
        let encoder = bank_encoder(UnknownCategoryPolicy::Error);
        assert_eq!(encoder.width(), 12 + 3 + 4 + 3 + 12 + 4);

        let names = encoder.feature_names_out();
        assert_eq!(names[0], "job_admin.");
        assert_eq!(names[12], "marital_divorced");
        assert_eq!(names.last().unwrap(), "poutcome_unknown");
    }

    #[test]
    fn test_transform_sets_one_per_column() {
        let encoder = bank_encoder(UnknownCategoryPolicy::Error);
        let encoded = encoder.transform(&SCENARIO).unwrap();

        assert_eq!(encoded.iter().filter(|&&v| v == 1.0).count(), 6);
        let hot: Vec<&str> = encoder
            .feature_names_out()
            .iter()
            .zip(&encoded)
            .filter(|(_, &v)| v == 1.0)
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(
            hot,
            vec![
                "job_management",
                "marital_married",
                "education_tertiary",
                "contact_cellular",
                "month_may",
                "poutcome_unknown"
            ]
        );
    }

    #[test]
    fn test_unknown_category_error_policy() {
        let encoder = bank_encoder(UnknownCategoryPolicy::Error);
        let mut values = SCENARIO;
        values[0] = "astronaut";

        let err = encoder.transform(&values).unwrap_err();
        assert_eq!(
            err,
            AlignmentError::UnknownCategory {
                column: "job".to_string(),
                value: "astronaut".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_category_ignore_policy() {
        let encoder = bank_encoder(UnknownCategoryPolicy::Ignore);
        let mut values = SCENARIO;
        values[0] = "astronaut";

        let encoded = encoder.transform(&values).unwrap();
        assert!(encoded[..12].iter().all(|&v| v == 0.0));
        assert_eq!(encoded.iter().filter(|&&v| v == 1.0).count(), 5);
    }

    #[test]
    fn test_dropped_category_encodes_as_zeros() {
        let mut export = bank_export(UnknownCategoryPolicy::Error);
        export.drop = Some(vec![None, Some("divorced".to_string()), None, None, None, None]);
        let encoder = OneHotEncoder::from_export(export).unwrap();

        assert!(!encoder.feature_names_out().iter().any(|n| n == "marital_divorced"));

        let mut values = SCENARIO;
        values[1] = "divorced";
        let encoded = encoder.transform(&values).unwrap();
        assert_eq!(encoded.iter().filter(|&&v| v == 1.0).count(), 5);
    }

    #[test]
    fn test_policy_defaults_to_error() {
        let json = serde_json::json!({
            "format_version": 1,
            "columns": CATEGORICAL_COLUMNS,
            "categories": bank_categories(),
        });
        let export: EncoderExport = serde_json::from_value(json).unwrap();
        assert_eq!(export.handle_unknown, UnknownCategoryPolicy::Error);
    }

    #[test]
    fn test_unsupported_policy_fails_to_parse() {
        let json = serde_json::json!({
            "format_version": 1,
            "columns": CATEGORICAL_COLUMNS,
            "categories": bank_categories(),
            "handle_unknown": "infrequent_if_exist",
        });
        assert!(serde_json::from_value::<EncoderExport>(json).is_err());
    }

    #[test]
    fn test_schema_rejections() {
        let mut wrong_columns = bank_export(UnknownCategoryPolicy::Error);
        wrong_columns.columns.swap(0, 1);
        assert!(matches!(
            OneHotEncoder::from_export(wrong_columns),
            Err(ArtifactError::Schema { .. })
        ));

        let mut duplicate = bank_export(UnknownCategoryPolicy::Error);
        duplicate.categories[1].push("single".to_string());
        assert!(matches!(
            OneHotEncoder::from_export(duplicate),
            Err(ArtifactError::Schema { .. })
        ));

        let mut empty = bank_export(UnknownCategoryPolicy::Error);
        empty.categories[3].clear();
        assert!(matches!(
            OneHotEncoder::from_export(empty),
            Err(ArtifactError::Schema { .. })
        ));

        let mut bad_drop = bank_export(UnknownCategoryPolicy::Error);
        bad_drop.drop = Some(vec![Some("pilot".to_string()), None, None, None, None, None]);
        assert!(matches!(
            OneHotEncoder::from_export(bad_drop),
            Err(ArtifactError::Schema { .. })
        ));

        let mut version = bank_export(UnknownCategoryPolicy::Error);
        version.format_version = 2;
        assert!(matches!(
            OneHotEncoder::from_export(version),
            Err(ArtifactError::UnsupportedVersion { found: 2, .. })
        ));
    }
}
