//! Prediction results and the insight shown alongside them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Predicted class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Subscribe,
    NotSubscribe,
}

impl Label {
    pub fn is_subscribe(self) -> bool {
        self == Label::Subscribe
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Subscribe => "subscribe",
            Label::NotSubscribe => "not_subscribe",
        }
    }
}

/// Outcome of one classifier run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the subscribe class, in [0, 1]
    pub probability: f64,
}

impl Prediction {
    /// Derive the user-facing insight from the probability.
    pub fn insight(&self, thresholds: &InsightThresholds) -> PredictionInsight {
        PredictionInsight {
            band: ProbabilityBand::from_probability(self.probability, thresholds),
            risk: CampaignRisk::from_probability(self.probability, thresholds),
            confidence: Confidence::from_prediction(self, thresholds),
            recommendation: recommendation(self.label).to_string(),
        }
    }
}

/// How likely the subscription is, coarsely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityBand {
    Low,
    Medium,
    High,
}

impl ProbabilityBand {
    pub fn from_probability(p: f64, thresholds: &InsightThresholds) -> Self {
        if p > thresholds.band_high {
            ProbabilityBand::High
        } else if p > thresholds.band_medium {
            ProbabilityBand::Medium
        } else {
            ProbabilityBand::Low
        }
    }
}

/// Campaign risk level: how much effort the contact is likely to waste
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignRisk {
    Low,
    Medium,
    High,
}

impl CampaignRisk {
    pub fn from_probability(p: f64, thresholds: &InsightThresholds) -> Self {
        if p < thresholds.risk_low {
            CampaignRisk::Low
        } else if p < thresholds.risk_medium {
            CampaignRisk::Medium
        } else {
            CampaignRisk::High
        }
    }
}

/// Confidence in the predicted label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Moderate,
    High,
    VeryHigh,
}

impl Confidence {
    /// Distance from the decision boundary in the direction of the label.
    pub fn from_prediction(prediction: &Prediction, thresholds: &InsightThresholds) -> Self {
        let p = prediction.probability;
        match prediction.label {
            Label::Subscribe => {
                if p > thresholds.confidence_very_high {
                    Confidence::VeryHigh
                } else if p > thresholds.confidence_high {
                    Confidence::High
                } else {
                    Confidence::Moderate
                }
            }
            Label::NotSubscribe => {
                if p < 1.0 - thresholds.confidence_very_high {
                    Confidence::VeryHigh
                } else if p < 1.0 - thresholds.confidence_high {
                    Confidence::High
                } else {
                    Confidence::Moderate
                }
            }
        }
    }
}

fn recommendation(label: Label) -> &'static str {
    match label {
        Label::Subscribe => {
            "Good candidate for focused follow-up. Consider personalized incentives to convert interest into a subscription."
        }
        Label::NotSubscribe => {
            "Consider alternative approaches for this customer segment or focus resources on higher-probability candidates."
        }
    }
}

/// Configurable cut-points for [`PredictionInsight`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Probability above which the band is `medium`
    pub band_medium: f64,
    /// Probability above which the band is `high`
    pub band_high: f64,
    /// Probability below which campaign risk is `low`
    pub risk_low: f64,
    /// Probability below which campaign risk is `medium`
    pub risk_medium: f64,
    /// Probability above which a subscribe label is held with high
    /// confidence; mirrored around 0.5 for not_subscribe
    pub confidence_high: f64,
    pub confidence_very_high: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            band_medium: 0.4,
            band_high: 0.7,
            risk_low: 0.3,
            risk_medium: 0.6,
            confidence_high: 0.6,
            confidence_very_high: 0.8,
        }
    }
}

/// Qualitative reading of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInsight {
    pub band: ProbabilityBand,
    pub risk: CampaignRisk,
    pub confidence: Confidence,
    pub recommendation: String,
}

/// What the presentation shell returns for one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Unique prediction identifier
    pub prediction_id: String,

    #[serde(flatten)]
    pub prediction: Prediction,

    pub insight: PredictionInsight,

    /// Prediction timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionResponse {
    pub fn new(prediction: Prediction, thresholds: &InsightThresholds) -> Self {
        Self {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            insight: prediction.insight(thresholds),
            prediction,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: Label, probability: f64) -> Prediction {
        Prediction { label, probability }
    }

    #[test]
    fn test_probability_band() {
        let t = InsightThresholds::default();
        assert_eq!(ProbabilityBand::from_probability(0.2, &t), ProbabilityBand::Low);
        assert_eq!(ProbabilityBand::from_probability(0.4, &t), ProbabilityBand::Low);
        assert_eq!(ProbabilityBand::from_probability(0.55, &t), ProbabilityBand::Medium);
        assert_eq!(ProbabilityBand::from_probability(0.71, &t), ProbabilityBand::High);
    }

    #[test]
    fn test_campaign_risk() {
        let t = InsightThresholds::default();
        assert_eq!(CampaignRisk::from_probability(0.1, &t), CampaignRisk::Low);
        assert_eq!(CampaignRisk::from_probability(0.3, &t), CampaignRisk::Medium);
        assert_eq!(CampaignRisk::from_probability(0.6, &t), CampaignRisk::High);
    }

    #[test]
    fn test_confidence_mirrors_label() {
        let t = InsightThresholds::default();
        assert_eq!(Confidence::from_prediction(&prediction(Label::Subscribe, 0.9), &t), Confidence::VeryHigh);
        assert_eq!(Confidence::from_prediction(&prediction(Label::Subscribe, 0.65), &t), Confidence::High);
        assert_eq!(Confidence::from_prediction(&prediction(Label::Subscribe, 0.55), &t), Confidence::Moderate);
        assert_eq!(Confidence::from_prediction(&prediction(Label::NotSubscribe, 0.1), &t), Confidence::VeryHigh);
        assert_eq!(Confidence::from_prediction(&prediction(Label::NotSubscribe, 0.3), &t), Confidence::High);
        assert_eq!(Confidence::from_prediction(&prediction(Label::NotSubscribe, 0.45), &t), Confidence::Moderate);
    }

    #[test]
    fn test_response_serialization() {
        let response = PredictionResponse::new(prediction(Label::NotSubscribe, 0.12), &InsightThresholds::default());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["label"], "not_subscribe");
        assert_eq!(json["probability"], 0.12);
        assert_eq!(json["insight"]["band"], "low");
        assert_eq!(json["insight"]["confidence"], "very_high");

        let deserialized: PredictionResponse = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized.prediction, response.prediction);
        assert_eq!(deserialized.prediction_id, response.prediction_id);
    }
}
