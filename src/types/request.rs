//! Analysis requests and results

use serde::{Deserialize, Serialize};

use super::criteria::SelectionCriteria;
use super::health::{HealthProfile, HealthRecord, HealthRiskAssessment, RiskSignals};
use super::nutrition::{DiiScore, FoodAnalysis, FoodItem};
use super::provider::ProviderKind;
use super::task::TaskType;
use crate::{NutrigateError, Result};

/// Task-specific request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum AnalysisPayload {
    FoodRecognition { text: String },
    DiiCalculation { food_items: Vec<FoodItem> },
    HealthAssessment { profile: HealthProfile },
    RiskDetection { records: Vec<HealthRecord> },
}

impl AnalysisPayload {
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::FoodRecognition { .. } => TaskType::FoodRecognition,
            Self::DiiCalculation { .. } => TaskType::DiiCalculation,
            Self::HealthAssessment { .. } => TaskType::HealthAssessment,
            Self::RiskDetection { .. } => TaskType::RiskDetection,
        }
    }
}

/// A single analysis request from an upstream caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub payload: AnalysisPayload,
    /// Opaque customer identifier.
    pub requester_id: String,
    #[serde(default)]
    pub criteria: SelectionCriteria,
}

impl AnalysisRequest {
    pub fn new(payload: AnalysisPayload, requester_id: impl Into<String>) -> Self {
        Self {
            payload,
            requester_id: requester_id.into(),
            criteria: SelectionCriteria::default(),
        }
    }

    pub fn food(text: impl Into<String>, requester_id: impl Into<String>) -> Self {
        Self::new(
            AnalysisPayload::FoodRecognition { text: text.into() },
            requester_id,
        )
    }

    pub fn dii(food_items: Vec<FoodItem>, requester_id: impl Into<String>) -> Self {
        Self::new(AnalysisPayload::DiiCalculation { food_items }, requester_id)
    }

    pub fn health(profile: HealthProfile, requester_id: impl Into<String>) -> Self {
        Self::new(AnalysisPayload::HealthAssessment { profile }, requester_id)
    }

    pub fn risk(records: Vec<HealthRecord>, requester_id: impl Into<String>) -> Self {
        Self::new(AnalysisPayload::RiskDetection { records }, requester_id)
    }

    pub fn criteria(mut self, criteria: SelectionCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn task_type(&self) -> TaskType {
        self.payload.task_type()
    }

    /// Reject requests no provider could answer meaningfully.
    pub fn validate(&self) -> Result<()> {
        if self.requester_id.trim().is_empty() {
            return Err(NutrigateError::InvalidInput("requester_id is empty".into()));
        }
        let empty = match &self.payload {
            AnalysisPayload::FoodRecognition { text } => text.trim().is_empty(),
            AnalysisPayload::DiiCalculation { food_items } => food_items.is_empty(),
            AnalysisPayload::HealthAssessment { .. } => false,
            AnalysisPayload::RiskDetection { records } => records.is_empty(),
        };
        if empty {
            return Err(NutrigateError::InvalidInput(format!(
                "{} request has no input",
                self.task_type()
            )));
        }
        if let Some(budget) = self.criteria.cost_budget
            && !(budget.is_finite() && budget >= 0.0)
        {
            return Err(NutrigateError::InvalidInput(format!(
                "cost_budget must be a non-negative amount, got {budget}"
            )));
        }
        Ok(())
    }
}

/// Task-specific analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum AnalysisOutput {
    FoodRecognition(FoodAnalysis),
    DiiCalculation(DiiScore),
    HealthAssessment(HealthRiskAssessment),
    RiskDetection(RiskSignals),
}

impl AnalysisOutput {
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::FoodRecognition(_) => TaskType::FoodRecognition,
            Self::DiiCalculation(_) => TaskType::DiiCalculation,
            Self::HealthAssessment(_) => TaskType::HealthAssessment,
            Self::RiskDetection(_) => TaskType::RiskDetection,
        }
    }
}

/// Outcome of one successful provider invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub provider_id: ProviderKind,
    pub task_type: TaskType,
    pub output: AnalysisOutput,
    /// Provider confidence in `[0, 1]`.
    pub confidence: f64,
    pub processing_time_ms: u64,
    pub cost_usd: f64,
}
