//! Configuration management for the predictor

use crate::types::prediction::InsightThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub prediction: PredictionConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the form is served on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Trained artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory containing the artifact files
    pub dir: String,
    /// ONNX classifier file name
    pub classifier: String,
    /// Fitted encoder export file name
    pub encoder: String,
    /// Trained feature list file name
    pub features: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
    /// Class ids in the column order of the classifier's probability tensor
    pub class_ids: Vec<i64>,
}

impl ArtifactsConfig {
    pub fn classifier_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.classifier)
    }

    pub fn encoder_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.encoder)
    }

    pub fn features_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.features)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: "models".to_string(),
            classifier: "random_forest.onnx".to_string(),
            encoder: "onehot_encoder.json".to_string(),
            features: "model_features.json".to_string(),
            onnx_threads: 1,
            class_ids: vec![0, 1],
        }
    }
}

/// Decision configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Class id of "subscribe"
    pub positive_class: i64,
    /// Probability above which the label is subscribe
    pub decision_threshold: f64,
    /// Cut-points for band, risk and confidence
    pub insight: InsightThresholds,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            positive_class: 1,
            decision_threshold: 0.5,
            insight: InsightThresholds::default(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Default configuration file location
    pub const DEFAULT_PATH: &'static str = "config/config.toml";

    /// Prefix of environment overrides, e.g. `BANK_PREDICTOR__SERVER__BIND`
    pub const ENV_PREFIX: &'static str = "BANK_PREDICTOR";

    /// Load configuration from a specific path, layered with environment
    /// overrides. A missing file falls back to defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).prefix_separator("__").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges the deserializer cannot express
    pub fn validate(&self) -> Result<()> {
        let threshold = self.prediction.decision_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("prediction.decision_threshold must be within [0, 1], got {}", threshold);
        }

        let insight = &self.prediction.insight;
        for (name, value) in [
            ("band_medium", insight.band_medium),
            ("band_high", insight.band_high),
            ("risk_low", insight.risk_low),
            ("risk_medium", insight.risk_medium),
            ("confidence_high", insight.confidence_high),
            ("confidence_very_high", insight.confidence_very_high),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("prediction.insight.{} must be within [0, 1], got {}", name, value);
            }
        }
        // not_subscribe confidence mirrors these around 0.5
        if insight.confidence_high < 0.5 {
            anyhow::bail!(
                "prediction.insight.confidence_high must be at least 0.5, got {}",
                insight.confidence_high
            );
        }
        if insight.band_medium > insight.band_high {
            anyhow::bail!("prediction.insight.band_medium must not exceed band_high");
        }
        if insight.risk_low > insight.risk_medium {
            anyhow::bail!("prediction.insight.risk_low must not exceed risk_medium");
        }
        if insight.confidence_high > insight.confidence_very_high {
            anyhow::bail!("prediction.insight.confidence_high must not exceed confidence_very_high");
        }

        if !self.artifacts.class_ids.contains(&self.prediction.positive_class) {
            anyhow::bail!(
                "prediction.positive_class {} is not among artifacts.class_ids {:?}",
                self.prediction.positive_class,
                self.artifacts.class_ids
            );
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!("logging.format must be \"json\" or \"pretty\", got {:?}", self.logging.format);
        }

        Ok(())
    }
}
