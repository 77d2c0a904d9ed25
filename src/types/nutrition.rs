//! Food recognition and dietary inflammatory index types

use serde::{Deserialize, Serialize};

/// A single food item, either supplied by the caller or recognised by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_kcal: Option<f64>,
}

impl FoodItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn amount_g(mut self, grams: f64) -> Self {
        self.amount_g = Some(grams);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Output of food recognition over free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodAnalysis {
    #[serde(default)]
    pub items: Vec<FoodItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_calories_kcal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Coarse inflammation classification of a DII score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflammationLevel {
    AntiInflammatory,
    Neutral,
    ProInflammatory,
    #[default]
    Unknown,
}

impl InflammationLevel {
    /// Classify a DII score: below −1 is anti-inflammatory, above +1 is
    /// pro-inflammatory.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            Self::Unknown
        } else if score < -1.0 {
            Self::AntiInflammatory
        } else if score > 1.0 {
            Self::ProInflammatory
        } else {
            Self::Neutral
        }
    }
}

/// Contribution of one dietary parameter to the overall score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiiComponent {
    pub parameter: String,
    pub contribution: f64,
}

/// Dietary Inflammatory Index result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiiScore {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub level: InflammationLevel,
    #[serde(default)]
    pub components: Vec<DiiComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
