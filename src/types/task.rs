//! Analysis task types

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four analysis capabilities every provider exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FoodRecognition,
    DiiCalculation,
    HealthAssessment,
    RiskDetection,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::FoodRecognition,
        TaskType::DiiCalculation,
        TaskType::HealthAssessment,
        TaskType::RiskDetection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodRecognition => "food_recognition",
            Self::DiiCalculation => "dii_calculation",
            Self::HealthAssessment => "health_assessment",
            Self::RiskDetection => "risk_detection",
        }
    }

    /// Whether results belong to one requester.
    ///
    /// Identity-scoped cache keys embed the requester id so that all of a
    /// requester's entries can be purged on a data-deletion request.
    pub fn is_identity_scoped(&self) -> bool {
        matches!(self, Self::HealthAssessment | Self::RiskDetection)
    }

    /// Confidence used when a provider does not report one.
    pub fn default_confidence(&self) -> f64 {
        match self {
            Self::FoodRecognition => 0.8,
            Self::DiiCalculation => 0.85,
            Self::HealthAssessment => 0.75,
            Self::RiskDetection => 0.7,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
