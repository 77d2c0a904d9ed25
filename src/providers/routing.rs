//! Routing configuration, weighted provider scoring, and fallback order.
//!
//! This module provides:
//! - [`RoutingConfig`]: fallback order, last-resort provider, and the
//!   provider that reasoning-heavy tasks go to directly
//! - [`ProviderRouter`]: scores registered providers against
//!   [`SelectionCriteria`] and the live [`HealthMonitor`] signal
//!
//! # Scoring
//!
//! Every candidate starts at 100. Criteria adjust the score additively
//! (budget ceiling, remaining daily budget, language, complexity, urgency,
//! accuracy), then the provider's health factor multiplies it and the
//! result is clamped to be non-negative. The highest score wins; ties go
//! to the provider earlier in the task's preference order.
//!
//! # Preference order
//!
//! Food recognition prefers `gemini, openai, anthropic`; the reasoning tasks
//! prefer `anthropic, openai, gemini`. Registered providers missing from the
//! list are appended in registration order.
//!
//! ```toml
//! [routing]
//! fallback_order = ["openai", "anthropic", "gemini"]
//! last_resort = "gemini"
//! reasoning_provider = "anthropic"
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::health::HealthMonitor;
use super::profile::{AccuracyTier, ComplexityFit, ProviderProfile};
use crate::types::{Accuracy, Complexity, ProviderKind, SelectionCriteria, TaskType};
use crate::{NutrigateError, Result};

const BASE_SCORE: f64 = 100.0;
const OVER_BUDGET_PENALTY: f64 = 50.0;
const BUDGET_HEADROOM_WEIGHT: f64 = 1000.0;
const LOW_BUDGET_RATIO: f64 = 0.2;
const LOW_BUDGET_BONUS: f64 = 20.0;

/// Fallback and direct-routing configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Providers tried, in order, after the primary is exhausted.
    pub fallback_order: Vec<ProviderKind>,
    /// Provider always tried last. Default: gemini (the cheapest).
    pub last_resort: ProviderKind,
    /// Provider DII and health assessments go to directly.
    pub reasoning_provider: ProviderKind,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fallback_order: vec![
                ProviderKind::OpenAi,
                ProviderKind::Anthropic,
                ProviderKind::Gemini,
            ],
            last_resort: ProviderKind::Gemini,
            reasoning_provider: ProviderKind::Anthropic,
        }
    }
}

impl RoutingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback_order(mut self, order: impl IntoIterator<Item = ProviderKind>) -> Self {
        self.fallback_order = order.into_iter().collect();
        self
    }

    pub fn last_resort(mut self, provider: ProviderKind) -> Self {
        self.last_resort = provider;
        self
    }

    pub fn reasoning_provider(mut self, provider: ProviderKind) -> Self {
        self.reasoning_provider = provider;
        self
    }
}

/// Preference order for a task before scoring.
pub fn task_preferences(task: TaskType) -> [ProviderKind; 3] {
    match task {
        TaskType::FoodRecognition => [
            ProviderKind::Gemini,
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
        ],
        TaskType::DiiCalculation | TaskType::HealthAssessment | TaskType::RiskDetection => [
            ProviderKind::Anthropic,
            ProviderKind::OpenAi,
            ProviderKind::Gemini,
        ],
    }
}

/// A provider's score for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProviderScore {
    pub provider_id: ProviderKind,
    pub score: f64,
}

/// Scores and ranks registered providers.
#[derive(Debug)]
pub struct ProviderRouter {
    /// Registered providers in registration order.
    profiles: Vec<ProviderProfile>,
    config: RoutingConfig,
    health: Arc<HealthMonitor>,
}

impl ProviderRouter {
    pub fn new(
        profiles: Vec<ProviderProfile>,
        config: RoutingConfig,
        health: Arc<HealthMonitor>,
    ) -> Self {
        Self {
            profiles,
            config,
            health,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn profile(&self, provider: ProviderKind) -> Option<&ProviderProfile> {
        self.profiles.iter().find(|p| p.kind == provider)
    }

    pub fn is_registered(&self, provider: ProviderKind) -> bool {
        self.profile(provider).is_some()
    }

    /// Registered providers, in registration order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.profiles.iter().map(|p| p.kind).collect()
    }

    /// Registered providers in the task's preference order.
    pub fn preference_order(&self, task: TaskType) -> Vec<ProviderKind> {
        let mut order: Vec<ProviderKind> = task_preferences(task)
            .into_iter()
            .filter(|p| self.is_registered(*p))
            .collect();
        for profile in &self.profiles {
            if !order.contains(&profile.kind) {
                order.push(profile.kind);
            }
        }
        order
    }

    /// Score every candidate, highest first.
    ///
    /// Equal scores keep the task's preference order.
    pub fn rank(&self, task: TaskType, criteria: &SelectionCriteria) -> Vec<ProviderScore> {
        let candidates: Vec<&ProviderProfile> = self
            .preference_order(task)
            .into_iter()
            .filter_map(|p| self.profile(p))
            .collect();
        let max_cost = candidates
            .iter()
            .map(|p| p.cost_per_call_usd)
            .fold(0.0_f64, f64::max);

        let mut scores: Vec<ProviderScore> = candidates
            .into_iter()
            .map(|profile| ProviderScore {
                provider_id: profile.kind,
                score: self.score(profile, criteria, max_cost),
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores
    }

    /// Pick the highest-scoring provider for a request.
    pub fn select_optimal_provider(
        &self,
        task: TaskType,
        criteria: &SelectionCriteria,
    ) -> Result<ProviderKind> {
        let ranked = self.rank(task, criteria);
        let best = ranked.first().ok_or(NutrigateError::NoProvider)?;
        debug!(
            task_type = task.as_str(),
            provider = best.provider_id.as_str(),
            score = best.score,
            candidates = ranked.len(),
            "selected provider"
        );
        Ok(best.provider_id)
    }

    fn score(&self, profile: &ProviderProfile, criteria: &SelectionCriteria, max_cost: f64) -> f64 {
        let cost = profile.cost_per_call_usd;
        let mut score = BASE_SCORE;

        if let Some(ceiling) = criteria.cost_budget {
            if cost > ceiling {
                score -= OVER_BUDGET_PENALTY;
            } else {
                score += (ceiling - cost) * BUDGET_HEADROOM_WEIGHT;
            }
        }

        if let Some(ratio) = criteria.remaining_budget_ratio
            && ratio < LOW_BUDGET_RATIO
            && max_cost > 0.0
        {
            score += LOW_BUDGET_BONUS * (1.0 - cost / max_cost);
        }

        if let Some(language) = criteria.language {
            if profile.strong_languages.contains(&language) {
                score += 15.0;
            } else if profile.weak_languages.contains(&language) {
                score -= 10.0;
            }
        }

        match (criteria.complexity, profile.complexity_fit) {
            (Some(Complexity::High), ComplexityFit::Reasoning) => score += 20.0,
            (Some(Complexity::High), ComplexityFit::Speed) => score -= 15.0,
            (Some(Complexity::Low), ComplexityFit::Speed) => score += 10.0,
            (Some(Complexity::Low), ComplexityFit::Reasoning) => score -= 5.0,
            _ => {}
        }

        if let Some(max_ms) = criteria.urgency.and_then(|u| u.max_acceptable_timeout_ms()) {
            score += (max_ms as f64 - profile.timeout_ms() as f64) / 1000.0;
        }

        if criteria.accuracy == Some(Accuracy::High) {
            score += match profile.accuracy {
                AccuracyTier::Premium => 25.0,
                AccuracyTier::High => 10.0,
                AccuracyTier::Standard => -10.0,
            };
        }

        let factor = self.health.health(profile.kind).factor();
        (score * factor).max(0.0)
    }

    // ===== Fallback =====

    /// Providers to try, in order, after `failed` is exhausted.
    ///
    /// Follows the configured fallback order, then any other registered
    /// provider, and always ends at the last-resort provider. `failed` and
    /// unregistered providers are skipped.
    pub fn fallback_chain(&self, failed: ProviderKind) -> Vec<ProviderKind> {
        let last_resort = self.last_resort_provider();
        let mut chain: Vec<ProviderKind> = Vec::new();
        let ordered = self
            .config
            .fallback_order
            .iter()
            .copied()
            .chain(self.profiles.iter().map(|p| p.kind));
        for provider in ordered {
            if provider != failed
                && Some(provider) != last_resort
                && self.is_registered(provider)
                && !chain.contains(&provider)
            {
                chain.push(provider);
            }
        }
        if let Some(last) = last_resort
            && last != failed
        {
            chain.push(last);
        }
        chain
    }

    /// First provider to fall back to after `failed`.
    pub fn fallback_provider(&self, failed: ProviderKind) -> Option<ProviderKind> {
        self.fallback_chain(failed).first().copied()
    }

    /// The last-resort provider, if registered.
    pub fn last_resort_provider(&self) -> Option<ProviderKind> {
        Some(self.config.last_resort).filter(|p| self.is_registered(*p))
    }

    /// The direct-routing provider for reasoning tasks, if registered.
    pub fn reasoning_provider(&self) -> Option<ProviderKind> {
        Some(self.config.reasoning_provider).filter(|p| self.is_registered(*p))
    }
}
