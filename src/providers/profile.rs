//! Static routing characteristics of each provider.

use std::time::Duration;

use serde::Deserialize;

use crate::types::{Language, ProviderKind};

/// Relative output quality of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    Standard,
    High,
    Premium,
}

/// Which end of the complexity range a provider is suited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityFit {
    /// Fast and cheap; favoured for simple requests.
    Speed,
    /// No particular lean.
    Balanced,
    /// Slower, stronger reasoning; favoured for complex requests.
    Reasoning,
}

/// Cost, latency, and strength profile used by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    /// Expected cost of one call in USD.
    pub cost_per_call_usd: f64,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub accuracy: AccuracyTier,
    pub complexity_fit: ComplexityFit,
    pub strong_languages: Vec<Language>,
    pub weak_languages: Vec<Language>,
}

impl ProviderProfile {
    /// Built-in profile for a provider.
    pub fn default_for(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAi => Self {
                kind,
                cost_per_call_usd: 0.010,
                timeout: Duration::from_secs(30),
                accuracy: AccuracyTier::High,
                complexity_fit: ComplexityFit::Balanced,
                strong_languages: vec![Language::English],
                weak_languages: vec![],
            },
            ProviderKind::Anthropic => Self {
                kind,
                cost_per_call_usd: 0.015,
                timeout: Duration::from_secs(45),
                accuracy: AccuracyTier::Premium,
                complexity_fit: ComplexityFit::Reasoning,
                strong_languages: vec![Language::English],
                weak_languages: vec![],
            },
            ProviderKind::Gemini => Self {
                kind,
                cost_per_call_usd: 0.005,
                timeout: Duration::from_secs(25),
                accuracy: AccuracyTier::Standard,
                complexity_fit: ComplexityFit::Speed,
                strong_languages: vec![Language::Japanese],
                weak_languages: vec![],
            },
        }
    }

    pub fn cost_per_call(mut self, usd: f64) -> Self {
        self.cost_per_call_usd = usd;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn accuracy(mut self, tier: AccuracyTier) -> Self {
        self.accuracy = tier;
        self
    }

    pub fn complexity_fit(mut self, fit: ComplexityFit) -> Self {
        self.complexity_fit = fit;
        self
    }

    pub fn strong_in(mut self, languages: impl IntoIterator<Item = Language>) -> Self {
        self.strong_languages = languages.into_iter().collect();
        self
    }

    pub fn weak_in(mut self, languages: impl IntoIterator<Item = Language>) -> Self {
        self.weak_languages = languages.into_iter().collect();
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}
