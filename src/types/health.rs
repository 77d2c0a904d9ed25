//! Health profile, time-series records, and risk outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static health profile of a requester, input to risk assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_dii_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl HealthProfile {
    /// Body mass index, when both height and weight are known.
    pub fn bmi(&self) -> Option<f64> {
        match (self.height_cm, self.weight_kg) {
            (Some(h), Some(w)) if h > 0.0 => {
                let m = h / 100.0;
                Some(w / (m * m))
            }
            _ => None,
        }
    }
}

/// One observation in a requester's health time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub recorded_at: DateTime<Utc>,
    /// Metric name, e.g. `systolic_bp`, `fasting_glucose`, `weight_kg`.
    pub metric: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl HealthRecord {
    pub fn new(recorded_at: DateTime<Utc>, metric: impl Into<String>, value: f64) -> Self {
        Self {
            recorded_at,
            metric: metric.into(),
            value,
            unit: None,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Risk classification shared by assessments and detected signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Unknown,
    Low,
    Moderate,
    High,
    Critical,
}

/// Output of a health-risk assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRiskAssessment {
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Normalised score in `[0, 100]`.
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A single signal detected in the time series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSignal {
    pub metric: String,
    #[serde(default)]
    pub severity: RiskLevel,
    #[serde(default)]
    pub description: String,
}

/// Output of risk-signal detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    #[serde(default)]
    pub signals: Vec<RiskSignal>,
    #[serde(default)]
    pub overall: RiskLevel,
    #[serde(default)]
    pub requires_attention: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmi_requires_height_and_weight() {
        let mut profile = HealthProfile {
            height_cm: Some(170.0),
            weight_kg: Some(65.0),
            ..Default::default()
        };
        let bmi = profile.bmi().unwrap();
        assert!((bmi - 22.49).abs() < 0.01);

        profile.weight_kg = None;
        assert!(profile.bmi().is_none());
    }

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Low > RiskLevel::Unknown);
    }
}
