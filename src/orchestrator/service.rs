//! The orchestrator: cache-first, route, retry, then fall back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheConfig, CacheStats, ResultCache, cache_key, requester_pattern};
use crate::cost::{CostSummary, CostTracker};
use crate::providers::retry::{attempt, with_retry};
use crate::providers::traits::dispatch;
use crate::providers::{
    AnalysisProvider, HealthMonitor, ProviderHealth, ProviderResponse, ProviderRouter,
    RetryConfig,
};
use crate::telemetry;
use crate::types::{
    Accuracy, AnalysisOutput, AnalysisRequest, AnalysisResult, FoodItem, HealthProfile,
    HealthRecord, ProviderKind, SelectionCriteria, TaskType, Urgency,
};
use crate::{NutrigateError, Result};

use super::builder::OrchestratorBuilder;

/// Per-attempt timeout for providers registered without a profile.
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates cache, router, cost tracker, and provider adapters.
///
/// `Send + Sync`; share it via `Arc`. Built with [`Orchestrator::builder`].
pub struct Orchestrator {
    pub(super) providers: HashMap<ProviderKind, Arc<dyn AnalysisProvider>>,
    pub(super) router: ProviderRouter,
    pub(super) cache: Arc<ResultCache>,
    pub(super) cache_config: CacheConfig,
    pub(super) costs: Arc<CostTracker>,
    pub(super) health: Arc<HealthMonitor>,
    pub(super) retry: RetryConfig,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    // ===== Public operations =====

    /// Recognise foods in free text.
    pub async fn analyze_food(
        &self,
        text: impl Into<String>,
        requester_id: impl Into<String>,
        criteria: SelectionCriteria,
    ) -> Result<AnalysisResult> {
        self.analyze(AnalysisRequest::food(text, requester_id).criteria(criteria))
            .await
    }

    /// Compute a dietary inflammatory index.
    pub async fn calculate_dii(
        &self,
        food_items: Vec<FoodItem>,
        requester_id: impl Into<String>,
    ) -> Result<AnalysisResult> {
        self.analyze(AnalysisRequest::dii(food_items, requester_id))
            .await
    }

    /// Assess health risk from a profile.
    pub async fn assess_health_risk(
        &self,
        profile: HealthProfile,
        requester_id: impl Into<String>,
    ) -> Result<AnalysisResult> {
        self.analyze(AnalysisRequest::health(profile, requester_id))
            .await
    }

    /// Detect risk signals in a health time series. Never cached.
    pub async fn detect_risk_signals(
        &self,
        records: Vec<HealthRecord>,
        requester_id: impl Into<String>,
    ) -> Result<AnalysisResult> {
        self.analyze(AnalysisRequest::risk(records, requester_id))
            .await
    }

    /// Run any analysis request.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult> {
        self.analyze_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run an analysis request that stops when `cancel` fires.
    ///
    /// Cancellation aborts the in-flight provider call, skips remaining
    /// retries and fallbacks, and records neither cost nor a cache entry.
    #[instrument(skip(self, request, cancel), fields(task_type = %request.task_type()))]
    pub async fn analyze_with_cancel(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(NutrigateError::Cancelled);
        }

        let task = request.task_type();
        let start = Instant::now();

        let ttl = self.cache_config.ttl_for(task);
        let key = match ttl {
            Some(_) => match cache_key(&request) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(error = %e, "could not compute cache key, skipping cache");
                    None
                }
            },
            None => None,
        };

        if let Some(ref key) = key {
            if let Some(hit) = self.cache.get(key) {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "task_type" => task.as_str())
                    .increment(1);
                debug!(provider = hit.provider_id.as_str(), "cache hit");
                return Ok(hit);
            }
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "task_type" => task.as_str())
                .increment(1);
        }

        let primary = self.primary_provider(&request)?;
        let (provider, response) = self.execute(primary, &request, cancel).await?;

        let confidence = response
            .confidence
            .unwrap_or_else(|| task.default_confidence())
            .clamp(0.0, 1.0);
        let result = AnalysisResult {
            provider_id: provider,
            task_type: task,
            output: response.data,
            confidence,
            processing_time_ms: start.elapsed().as_millis() as u64,
            cost_usd: response.cost_usd,
        };

        if response.degraded {
            debug!(provider = provider.as_str(), "degraded result, not caching");
        } else if let (Some(key), Some(ttl)) = (key, ttl) {
            self.cache.set(key, result.clone(), ttl);
        }
        if let Err(e) =
            self.costs
                .record_usage(provider, result.cost_usd, &request.requester_id, task)
        {
            warn!(provider = provider.as_str(), error = %e, "failed to record usage");
        }

        info!(
            provider = provider.as_str(),
            cost_usd = result.cost_usd,
            confidence = result.confidence,
            processing_time_ms = result.processing_time_ms,
            "analysis completed"
        );
        Ok(result)
    }

    // ===== Execution =====

    /// Choose the first provider to try.
    ///
    /// DII and health assessments go straight to the reasoning provider when
    /// it is registered. Risk detection always routes for high urgency and
    /// high accuracy.
    fn primary_provider(&self, request: &AnalysisRequest) -> Result<ProviderKind> {
        let task = request.task_type();
        if matches!(
            task,
            TaskType::DiiCalculation | TaskType::HealthAssessment
        ) && let Some(provider) = self.router.reasoning_provider()
        {
            return Ok(provider);
        }

        let mut criteria = request.criteria.clone();
        if task == TaskType::RiskDetection {
            criteria.urgency = Some(Urgency::High);
            criteria.accuracy = Some(Accuracy::High);
        }
        if criteria.remaining_budget_ratio.is_none() {
            criteria.remaining_budget_ratio = Some(self.costs.daily_budget_ratio());
        }
        self.router.select_optimal_provider(task, &criteria)
    }

    /// Retry the primary, then try each fallback once.
    async fn execute(
        &self,
        primary: ProviderKind,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<(ProviderKind, ProviderResponse<AnalysisOutput>)> {
        let task = request.task_type();
        let mut attempts = 0;

        let mut last = match self
            .invoke(primary, &self.retry, request, cancel, &mut attempts)
            .await
        {
            Ok(response) => return Ok((primary, response)),
            Err(NutrigateError::Cancelled) => return Err(NutrigateError::Cancelled),
            Err(e) => e,
        };

        let single = RetryConfig::disabled();
        for fallback in self.router.fallback_chain(primary) {
            metrics::counter!(telemetry::FALLBACKS_TOTAL,
                "provider" => fallback.as_str(),
                "task_type" => task.as_str(),
            )
            .increment(1);
            warn!(
                from = primary.as_str(),
                to = fallback.as_str(),
                error = %last,
                "falling back to next provider"
            );
            match self
                .invoke(fallback, &single, request, cancel, &mut attempts)
                .await
            {
                Ok(response) => return Ok((fallback, response)),
                Err(NutrigateError::Cancelled) => return Err(NutrigateError::Cancelled),
                Err(e) => last = e,
            }
        }

        warn!(attempts, error = %last, "all providers failed");
        Err(NutrigateError::AllProvidersFailed {
            attempts,
            last: Box::new(last),
        })
    }

    /// Call one provider under `retry`, recording health and request metrics
    /// for every attempt.
    async fn invoke(
        &self,
        kind: ProviderKind,
        retry: &RetryConfig,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
        attempts: &mut u32,
    ) -> Result<ProviderResponse<AnalysisOutput>> {
        let provider: &dyn AnalysisProvider = self
            .providers
            .get(&kind)
            .ok_or(NutrigateError::ProviderNotRegistered(kind))?
            .as_ref();
        let timeout = self
            .router
            .profile(kind)
            .map(|p| p.timeout)
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT);
        let task = request.task_type();
        let payload = &request.payload;
        let requester = request.requester_id.as_str();
        let health: &HealthMonitor = &self.health;

        with_retry(retry, kind, task, cancel, attempts, move || async move {
            let start = Instant::now();
            let outcome = attempt(timeout, cancel, dispatch(provider, payload, requester)).await;
            let elapsed = start.elapsed();
            match &outcome {
                Ok(_) => health.record_success(kind, elapsed),
                Err(NutrigateError::Cancelled) => {}
                Err(_) => health.record_failure(kind, elapsed),
            }
            record_attempt(kind, task, elapsed, outcome.is_ok());
            outcome
        })
        .await
    }

    // ===== Maintenance and reporting =====

    /// Remove every cached result keyed to `requester_id`.
    pub fn purge_requester(&self, requester_id: &str) -> Result<usize> {
        let removed = self
            .cache
            .delete_pattern(&requester_pattern(requester_id))?;
        info!(removed, "purged cached results for requester");
        Ok(removed)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cost_summary(&self, window_days: u32) -> CostSummary {
        self.costs.cost_summary(window_days)
    }

    /// Advisory spend suggestions, including cache effectiveness.
    pub fn optimization_suggestions(&self) -> Vec<String> {
        self.costs
            .optimization_suggestions(Some(&self.cache.stats()))
    }

    /// Health of every registered provider.
    pub fn provider_health(&self) -> HashMap<ProviderKind, ProviderHealth> {
        self.router
            .providers()
            .into_iter()
            .map(|p| (p, self.health.health(p)))
            .collect()
    }

    /// Probe every adapter concurrently and feed the results into the
    /// health window.
    pub async fn probe_providers(&self) -> HashMap<ProviderKind, bool> {
        let probes = self.providers.iter().map(|(kind, provider)| async move {
            let start = Instant::now();
            let healthy = provider.health_check().await;
            (*kind, healthy, start.elapsed())
        });

        join_all(probes)
            .await
            .into_iter()
            .map(|(kind, healthy, elapsed)| {
                if healthy {
                    self.health.record_success(kind, elapsed);
                } else {
                    self.health.record_failure(kind, elapsed);
                }
                debug!(provider = kind.as_str(), healthy, "probe finished");
                (kind, healthy)
            })
            .collect()
    }

    /// Start the periodic cache sweep. Requires a tokio runtime.
    pub fn start_maintenance(&self) -> JoinHandle<()> {
        self.cache
            .spawn_cleanup(self.cache_config.cleanup_interval)
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn cost_tracker(&self) -> &Arc<CostTracker> {
        &self.costs
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("providers", &self.router.providers())
            .field("retry", &self.retry)
            .field("cache", &self.cache.stats())
            .field("costs", &self.costs)
            .finish_non_exhaustive()
    }
}

/// Record request outcome metrics (counter + histogram).
fn record_attempt(provider: ProviderKind, task: TaskType, elapsed: Duration, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "provider" => provider.as_str(),
        "task_type" => task.as_str(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "provider" => provider.as_str(),
        "task_type" => task.as_str(),
    )
    .record(elapsed.as_secs_f64());
}
