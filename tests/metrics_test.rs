//! Tests for metrics emission.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use nutrigate::providers::{AnalysisProvider, ProviderResponse};
use nutrigate::telemetry;
use nutrigate::{
    AnalysisOutput, AnalysisResult, CostLimits, CostTracker, DiiScore, FoodAnalysis, FoodItem,
    HealthProfile, HealthRecord, HealthRiskAssessment, NutrigateError, Orchestrator,
    ProviderKind, Result, ResultCache, RetryConfig, RiskSignals, SelectionCriteria, TaskType,
};

// ============================================================================
// Mock provider
// ============================================================================

struct MockProvider {
    kind: ProviderKind,
    fail: bool,
    calls: AtomicU32,
}

impl MockProvider {
    fn new(kind: ProviderKind, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail,
            calls: AtomicU32::new(0),
        })
    }

    fn respond<T>(&self, data: T) -> Result<ProviderResponse<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NutrigateError::Http("connection reset".into()));
        }
        Ok(ProviderResponse::new(data, 0.01))
    }
}

#[async_trait]
impl AnalysisProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn analyze_food(&self, _: &str, _: &str) -> Result<ProviderResponse<FoodAnalysis>> {
        self.respond(FoodAnalysis::default())
    }

    async fn calculate_dii(&self, _: &[FoodItem], _: &str) -> Result<ProviderResponse<DiiScore>> {
        self.respond(DiiScore::default())
    }

    async fn assess_health_risk(
        &self,
        _: &HealthProfile,
        _: &str,
    ) -> Result<ProviderResponse<HealthRiskAssessment>> {
        self.respond(HealthRiskAssessment::default())
    }

    async fn detect_risk_signals(
        &self,
        _: &[HealthRecord],
        _: &str,
    ) -> Result<ProviderResponse<RiskSignals>> {
        self.respond(RiskSignals::default())
    }

    async fn health_check(&self) -> bool {
        !self.fail
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_with_label(snapshot, name, None)
}

/// Sum counter values matching a metric name and, optionally, one label.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            Some((k, v)) => key
                .key()
                .labels()
                .any(|l| l.key() == k && l.value() == v),
            None => true,
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn fast_retry() -> RetryConfig {
    RetryConfig::new()
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_request_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let orchestrator = Orchestrator::builder()
                    .provider(MockProvider::new(ProviderKind::Gemini, false))
                    .build()?;
                orchestrator
                    .analyze_food("rice", "alice", SelectionCriteria::new())
                    .await?;
                orchestrator
                    .analyze_food("rice", "alice", SelectionCriteria::new())
                    .await
            })
        })
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, Some(("status", "ok"))),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::COST_MICRO_USD_TOTAL,
            Some(("provider", "gemini"))
        ),
        10_000
    );
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_and_fallbacks_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let orchestrator = Orchestrator::builder()
                    .provider(MockProvider::new(ProviderKind::Gemini, true))
                    .provider(MockProvider::new(ProviderKind::OpenAi, false))
                    .retry(fast_retry())
                    .build()?;
                orchestrator
                    .analyze_food("rice", "alice", SelectionCriteria::new())
                    .await
            })
        })
    });
    assert_eq!(result.unwrap().provider_id, ProviderKind::OpenAi);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 4);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, Some(("status", "error"))),
        3
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::RETRIES_TOTAL, Some(("transient", "true"))),
        2
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::FALLBACKS_TOTAL, Some(("provider", "openai"))),
        1
    );
}

#[test]
fn alerts_and_evictions_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let tracker = CostTracker::new(CostLimits::new(1.0, 1000.0));
        tracker
            .record_usage(ProviderKind::Anthropic, 2.0, "alice", TaskType::HealthAssessment)
            .unwrap();

        let cache = ResultCache::with_max_entries(1);
        let result = AnalysisResult {
            provider_id: ProviderKind::Gemini,
            task_type: TaskType::FoodRecognition,
            output: AnalysisOutput::FoodRecognition(FoodAnalysis::default()),
            confidence: 0.8,
            processing_time_ms: 1,
            cost_usd: 0.005,
        };
        cache.set("a", result.clone(), Duration::from_secs(60));
        cache.set("b", result, Duration::from_secs(60));
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::COST_ALERTS_TOTAL), 2);
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::COST_ALERTS_TOTAL,
            Some(("kind", "daily_exceeded"))
        ),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_EVICTIONS_TOTAL), 1);
}
