use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Short-horizon trend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class probabilities in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub bullish: f64,
    pub bearish: f64,
    pub neutral: f64,
}

impl Probabilities {
    pub fn total(&self) -> f64 {
        self.bullish + self.bearish + self.neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub direction: Direction,
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    #[serde(other)]
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    pub trend: VolumeTrend,
    #[serde(default = "unit_ratio")]
    pub ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_average: Option<f64>,
}

fn unit_ratio() -> f64 {
    1.0
}

/// Computed indicator snapshot. Every reading is optional because the remote
/// collaborator omits what it cannot compute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema: Option<BTreeMap<u32, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma: Option<BTreeMap<u32, f64>>,
    #[serde(
        default,
        alias = "volumeAnalysis",
        skip_serializing_if = "Option::is_none"
    )]
    pub volume_analysis: Option<VolumeAnalysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// News sentiment attached to an insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentiment {
    pub sentiment: SentimentLabel,
    pub impact: Impact,
    #[serde(default)]
    pub headlines: Vec<String>,
    pub score: f64,
}

impl NewsSentiment {
    /// Label a raw score in `[-1, 1]`.
    pub fn from_score(score: f64, headlines: Vec<String>) -> Self {
        let score = if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let sentiment = if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        let impact = match score.abs() {
            magnitude if magnitude >= 0.5 => Impact::High,
            magnitude if magnitude >= 0.2 => Impact::Medium,
            _ => Impact::Low,
        };

        Self {
            sentiment,
            impact,
            headlines,
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 70.0 {
            Self::Low
        } else if confidence > 50.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Externally visible result of one analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub prediction: Prediction,
    #[serde(default, alias = "technicalAnalysis")]
    pub technical_analysis: TechnicalAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<NewsSentiment>,
    pub explanation: String,
    #[serde(alias = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(alias = "generatedAt")]
    pub generated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_insight_from_remote() {
        let payload = r#"{
            "prediction": {
                "direction": "bearish",
                "confidence": 64.5,
                "probabilities": {"bullish": 20, "bearish": 65, "neutral": 15},
                "timestamp": 1704067200000
            },
            "technicalAnalysis": {"rsi": 41.2, "ema": {"20": 101.5}},
            "explanation": "Sellers in control.",
            "riskLevel": "medium",
            "generatedAt": 1704067200001
        }"#;

        let insight: Insight = serde_json::from_str(payload).expect("must decode");
        assert_eq!(insight.prediction.direction, Direction::Bearish);
        assert_eq!(insight.risk_level, RiskLevel::Medium);
        assert_eq!(insight.technical_analysis.rsi, Some(41.2));
        assert_eq!(
            insight.technical_analysis.ema.as_ref().and_then(|ema| ema.get(&20)),
            Some(&101.5)
        );
        assert!(insight.warnings.is_empty());
    }

    #[test]
    fn unknown_volume_trend_decodes_as_stable() {
        let analysis: VolumeAnalysis =
            serde_json::from_str(r#"{"trend": "sideways"}"#).expect("must decode");
        assert_eq!(analysis.trend, VolumeTrend::Stable);
        assert_eq!(analysis.ratio, 1.0);
    }

    #[test]
    fn labels_news_sentiment_by_score() {
        let positive = NewsSentiment::from_score(0.6, Vec::new());
        assert_eq!(positive.sentiment, SentimentLabel::Positive);
        assert_eq!(positive.impact, Impact::High);

        let flat = NewsSentiment::from_score(0.05, Vec::new());
        assert_eq!(flat.sentiment, SentimentLabel::Neutral);
        assert_eq!(flat.impact, Impact::Low);

        let negative = NewsSentiment::from_score(-0.3, Vec::new());
        assert_eq!(negative.sentiment, SentimentLabel::Negative);
        assert_eq!(negative.impact, Impact::Medium);
    }

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_confidence(85.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_confidence(70.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_confidence(50.0), RiskLevel::High);
    }
}
