//! Provider selection criteria

use serde::{Deserialize, Serialize};

/// Language of the analysed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Japanese,
    Chinese,
    Korean,
    Other,
}

/// Expected input complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// How quickly the caller needs an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    High,
}

impl Urgency {
    /// Longest provider timeout the caller is willing to sit through, in ms.
    ///
    /// `None` means latency does not influence routing.
    pub fn max_acceptable_timeout_ms(&self) -> Option<u64> {
        match self {
            Self::Low => None,
            Self::Normal => Some(60_000),
            Self::High => Some(30_000),
        }
    }
}

/// Accuracy requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Standard,
    High,
}

/// Optional hints that steer provider selection.
///
/// All fields are optional; an empty set of criteria routes purely on the
/// task's preference order and provider health.
///
/// ```rust
/// # use nutrigate::{SelectionCriteria, Language, Urgency};
/// let criteria = SelectionCriteria::new()
///     .language(Language::Japanese)
///     .urgency(Urgency::High)
///     .cost_budget(0.02);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    /// Per-request cost ceiling in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<Accuracy>,
    /// Remaining daily budget as a fraction of the daily limit.
    ///
    /// Filled in by the orchestrator from the cost tracker; callers normally
    /// leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_budget_ratio: Option<f64>,
}

impl SelectionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn cost_budget(mut self, usd: f64) -> Self {
        self.cost_budget = Some(usd);
        self
    }

    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn remaining_budget_ratio(mut self, ratio: f64) -> Self {
        self.remaining_budget_ratio = Some(ratio);
        self
    }
}
