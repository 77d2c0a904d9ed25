//! Builder for configuring orchestrator instances

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::Orchestrator;
use crate::cache::{CacheConfig, ResultCache};
use crate::cost::{AlertSink, CostLimits, CostTracker};
use crate::providers::{
    AnalysisProvider, HealthMonitor, LlmAnalysisProvider, ProviderProfile, ProviderRouter,
    RetryConfig, RoutingConfig,
};
use crate::types::ProviderKind;
use crate::{NutrigateError, Result};

/// Builder for [`Orchestrator`].
///
/// ```rust,no_run
/// use nutrigate::Orchestrator;
///
/// # fn main() -> nutrigate::Result<()> {
/// let orchestrator = Orchestrator::builder()
///     .openai("sk-...")
///     .anthropic("sk-ant-...")
///     .gemini("AIza...")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    /// Registered adapters in registration order.
    providers: Vec<(Arc<dyn AnalysisProvider>, ProviderProfile)>,
    retry: RetryConfig,
    routing: RoutingConfig,
    cache: CacheConfig,
    limits: CostLimits,
    alert_sink: Option<Arc<dyn AlertSink>>,
    health_window: usize,
    health_retention: Duration,
    http_client: reqwest::Client,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            retry: RetryConfig::default(),
            routing: RoutingConfig::default(),
            cache: CacheConfig::default(),
            limits: CostLimits::default(),
            alert_sink: None,
            health_window: 100,
            health_retention: Duration::from_secs(24 * 3600),
            http_client: reqwest::Client::new(),
        }
    }

    /// Configure the OpenAI adapter with default model and profile.
    pub fn openai(self, api_key: impl Into<String>) -> Self {
        self.llm(ProviderKind::OpenAi, api_key.into())
    }

    /// Configure the Anthropic adapter with default model and profile.
    pub fn anthropic(self, api_key: impl Into<String>) -> Self {
        self.llm(ProviderKind::Anthropic, api_key.into())
    }

    /// Configure the Gemini adapter with default model and profile.
    pub fn gemini(self, api_key: impl Into<String>) -> Self {
        self.llm(ProviderKind::Gemini, api_key.into())
    }

    fn llm(self, kind: ProviderKind, api_key: String) -> Self {
        let profile = ProviderProfile::default_for(kind);
        let adapter =
            LlmAnalysisProvider::with_http_client(kind, Some(api_key), self.http_client.clone())
                .timeout_secs(profile.timeout.as_secs());
        self.provider_with_profile(Arc::new(adapter), profile)
    }

    /// Register an adapter with its built-in profile.
    pub fn provider(self, provider: Arc<dyn AnalysisProvider>) -> Self {
        let profile = ProviderProfile::default_for(provider.kind());
        self.provider_with_profile(provider, profile)
    }

    /// Register an adapter with a custom profile.
    ///
    /// Registering the same provider kind twice replaces the earlier adapter
    /// and keeps its registration slot.
    pub fn provider_with_profile(
        mut self,
        provider: Arc<dyn AnalysisProvider>,
        profile: ProviderProfile,
    ) -> Self {
        let profile = ProviderProfile {
            kind: provider.kind(),
            ..profile
        };
        match self
            .providers
            .iter_mut()
            .find(|(p, _)| p.kind() == profile.kind)
        {
            Some(slot) => *slot = (provider, profile),
            None => self.providers.push((provider, profile)),
        }
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn routing(mut self, config: RoutingConfig) -> Self {
        self.routing = config;
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn cost_limits(mut self, limits: CostLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Deliver budget alerts to `sink` instead of the log.
    pub fn alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    /// Size and retention of the per-provider health window.
    pub fn health_window(mut self, samples: usize, retention: Duration) -> Self {
        self.health_window = samples;
        self.health_retention = retention;
        self
    }

    /// Share an HTTP client with the built-in adapters' health probes.
    ///
    /// Must be called before `openai` / `anthropic` / `gemini` to take
    /// effect for them.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    fn has_provider(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Build the orchestrator.
    ///
    /// Fails with `NoProvider` if no adapter is registered, and with
    /// `Configuration` if the retry policy allows no attempts.
    pub fn build(self) -> Result<Orchestrator> {
        if !self.has_provider() {
            return Err(NutrigateError::NoProvider);
        }
        if self.retry.max_attempts == 0 {
            return Err(NutrigateError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        let health = Arc::new(HealthMonitor::new(
            self.health_window,
            self.health_retention,
        ));

        let mut providers = HashMap::new();
        let mut profiles = Vec::with_capacity(self.providers.len());
        for (provider, profile) in self.providers {
            providers.insert(profile.kind, provider);
            profiles.push(profile);
        }
        let router = ProviderRouter::new(profiles, self.routing, health.clone());
        info!(
            version = %crate::version_string(),
            providers = ?router.providers(),
            "orchestrator built"
        );

        let mut costs = CostTracker::new(self.limits);
        if let Some(sink) = self.alert_sink {
            costs = costs.with_sink(sink);
        }

        Ok(Orchestrator {
            providers,
            router,
            cache: Arc::new(ResultCache::new(&self.cache)),
            cache_config: self.cache,
            costs: Arc::new(costs),
            health,
            retry: self.retry,
        })
    }
}
