//! The provider adapter contract.
//!
//! Every external AI backend is wrapped in an [`AnalysisProvider`]. Adapters
//! know nothing about routing, caching, or budgets; they translate one task
//! into one backend call and report what it cost.
//!
//! # Failure semantics
//!
//! - Network failures, non-2xx responses, and timeouts are returned as errors
//!   and handled by the orchestrator's retry-then-fallback policy.
//! - A reply that cannot be parsed is *not* an error: the adapter returns the
//!   task's default output with a low confidence and logs a warning.

use async_trait::async_trait;

use super::parse::FALLBACK_CONFIDENCE;
use crate::Result;
use crate::types::{
    AnalysisOutput, AnalysisPayload, DiiScore, FoodAnalysis, FoodItem, HealthProfile,
    HealthRecord, HealthRiskAssessment, ProviderKind, RiskSignals,
};

/// Output of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse<T> {
    pub data: T,
    /// Adapter-reported confidence in `[0, 1]`, if it has one.
    pub confidence: Option<f64>,
    /// Actual or estimated cost of the call in USD.
    pub cost_usd: f64,
    /// The reply could not be parsed and `data` is a placeholder default.
    /// Degraded results are returned but never cached.
    pub degraded: bool,
}

impl<T> ProviderResponse<T> {
    pub fn new(data: T, cost_usd: f64) -> Self {
        Self {
            data,
            confidence: None,
            cost_usd,
            degraded: false,
        }
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Mark the response as a placeholder for an unparseable reply.
    pub fn degraded(mut self) -> Self {
        self.confidence = Some(FALLBACK_CONFIDENCE);
        self.degraded = true;
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderResponse<U> {
        ProviderResponse {
            data: f(self.data),
            confidence: self.confidence,
            cost_usd: self.cost_usd,
            degraded: self.degraded,
        }
    }
}

/// Uniform capability wrapper around one external AI backend.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Which backend this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Recognise foods in free text.
    async fn analyze_food(
        &self,
        text: &str,
        requester_id: &str,
    ) -> Result<ProviderResponse<FoodAnalysis>>;

    /// Compute a dietary inflammatory index for a set of food items.
    async fn calculate_dii(
        &self,
        food_items: &[FoodItem],
        requester_id: &str,
    ) -> Result<ProviderResponse<DiiScore>>;

    /// Assess health risk from a static profile.
    async fn assess_health_risk(
        &self,
        profile: &HealthProfile,
        requester_id: &str,
    ) -> Result<ProviderResponse<HealthRiskAssessment>>;

    /// Detect risk signals in a health time series.
    async fn detect_risk_signals(
        &self,
        records: &[HealthRecord],
        requester_id: &str,
    ) -> Result<ProviderResponse<RiskSignals>>;

    /// Lightweight liveness probe. Never errors; unreachable is `false`.
    async fn health_check(&self) -> bool;
}

/// Route a payload to the matching adapter operation.
pub async fn dispatch(
    provider: &dyn AnalysisProvider,
    payload: &AnalysisPayload,
    requester_id: &str,
) -> Result<ProviderResponse<AnalysisOutput>> {
    match payload {
        AnalysisPayload::FoodRecognition { text } => Ok(provider
            .analyze_food(text, requester_id)
            .await?
            .map(AnalysisOutput::FoodRecognition)),
        AnalysisPayload::DiiCalculation { food_items } => Ok(provider
            .calculate_dii(food_items, requester_id)
            .await?
            .map(AnalysisOutput::DiiCalculation)),
        AnalysisPayload::HealthAssessment { profile } => Ok(provider
            .assess_health_risk(profile, requester_id)
            .await?
            .map(AnalysisOutput::HealthAssessment)),
        AnalysisPayload::RiskDetection { records } => Ok(provider
            .detect_risk_signals(records, requester_id)
            .await?
            .map(AnalysisOutput::RiskDetection)),
    }
}
