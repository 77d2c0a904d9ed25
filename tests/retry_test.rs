//! Tests for retry policy: backoff schedules, provider hints, and attempt
//! accounting through the orchestrator.
//!
//! Backoff sleeps run on a paused clock, so elapsed time is deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use nutrigate::providers::{AnalysisProvider, ProviderResponse};
use nutrigate::{
    Backoff, DiiScore, FoodAnalysis, FoodItem, HealthProfile, HealthRecord, HealthRiskAssessment,
    NutrigateError, Orchestrator, ProviderKind, Result, RetryConfig, RiskSignals,
    SelectionCriteria,
};

// ============================================================================
// Mock provider
// ============================================================================

/// Fails its first `failures` calls with the error from `error`.
struct FlakyProvider {
    kind: ProviderKind,
    failures: u32,
    error: fn() -> NutrigateError,
    calls: AtomicU32,
}

impl FlakyProvider {
    fn new(kind: ProviderKind, failures: u32, error: fn() -> NutrigateError) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failures,
            error,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond<T>(&self, data: T) -> Result<ProviderResponse<T>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            return Err((self.error)());
        }
        Ok(ProviderResponse::new(data, 0.005))
    }
}

#[async_trait]
impl AnalysisProvider for FlakyProvider {
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
        true
    }
}

fn server_error() -> NutrigateError {
    NutrigateError::Api {
        status: 500,
        message: "internal".into(),
    }
}

fn rate_limited() -> NutrigateError {
    NutrigateError::RateLimited {
        retry_after: Some(Duration::from_secs(10)),
    }
}

fn auth_failed() -> NutrigateError {
    NutrigateError::AuthenticationFailed
}

/// Paused-clock sleeps land on millisecond ticks; allow one tick of slack.
fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

fn single(provider: Arc<FlakyProvider>, retry: RetryConfig) -> Orchestrator {
    Orchestrator::builder()
        .provider(provider)
        .retry(retry)
        .build()
        .unwrap()
}

// ============================================================================
// Schedules
// ============================================================================

#[test]
fn default_policy_is_three_linear_attempts() {
    let config = RetryConfig::default();
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.backoff, Backoff::Linear);
    assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
    assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
}

#[test]
fn disabled_policy_makes_one_attempt() {
    assert_eq!(RetryConfig::disabled().max_attempts, 1);
}

#[test]
fn delays_never_exceed_max() {
    let config = RetryConfig::new()
        .initial_delay(Duration::from_secs(10))
        .max_delay(Duration::from_secs(25));
    assert_eq!(config.delay_for_attempt(1), Duration::from_secs(20));
    assert_eq!(config.delay_for_attempt(5), Duration::from_secs(25));
}

// ============================================================================
// Through the orchestrator
// ============================================================================

#[tokio::test(start_paused = true)]
async fn linear_backoff_between_attempts() {
    let gemini = FlakyProvider::new(ProviderKind::Gemini, 2, server_error);
    let orchestrator = single(gemini.clone(), RetryConfig::default());

    let start = Instant::now();
    orchestrator
        .analyze_food("rice", "alice", SelectionCriteria::new())
        .await
        .unwrap();

    assert_eq!(gemini.calls(), 3);
    assert_elapsed(start, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_between_attempts() {
    let gemini = FlakyProvider::new(ProviderKind::Gemini, 3, server_error);
    let retry = RetryConfig::new()
        .max_attempts(4)
        .initial_delay(Duration::from_millis(500))
        .backoff(Backoff::Exponential);
    let orchestrator = single(gemini.clone(), retry);

    let start = Instant::now();
    orchestrator
        .analyze_food("rice", "alice", SelectionCriteria::new())
        .await
        .unwrap();

    assert_eq!(gemini.calls(), 4);
    // 0.5s + 1s + 2s
    assert_elapsed(start, Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_extends_the_delay() {
    let gemini = FlakyProvider::new(ProviderKind::Gemini, 1, rate_limited);
    let orchestrator = single(gemini.clone(), RetryConfig::default());

    let start = Instant::now();
    orchestrator
        .analyze_food("rice", "alice", SelectionCriteria::new())
        .await
        .unwrap();

    assert_eq!(gemini.calls(), 2);
    assert_elapsed(start, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_are_retried_too() {
    let gemini = FlakyProvider::new(ProviderKind::Gemini, u32::MAX, auth_failed);
    let orchestrator = single(gemini.clone(), RetryConfig::default());

    let err = orchestrator
        .analyze_food("rice", "alice", SelectionCriteria::new())
        .await
        .unwrap_err();

    assert_eq!(gemini.calls(), 3);
    match err {
        NutrigateError::AllProvidersFailed { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, NutrigateError::AuthenticationFailed));
        }
        other => panic!("expected AllProvidersFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fallbacks_are_not_retried() {
    let gemini = FlakyProvider::new(ProviderKind::Gemini, u32::MAX, server_error);
    let openai = FlakyProvider::new(ProviderKind::OpenAi, u32::MAX, server_error);
    let orchestrator = Orchestrator::builder()
        .provider(gemini.clone())
        .provider(openai.clone())
        .retry(RetryConfig::new().max_attempts(2))
        .build()
        .unwrap();

    let err = orchestrator
        .analyze_food("rice", "alice", SelectionCriteria::new())
        .await
        .unwrap_err();

    assert_eq!(gemini.calls(), 2);
    assert_eq!(openai.calls(), 1);
    assert!(matches!(
        err,
        NutrigateError::AllProvidersFailed { attempts: 3, .. }
    ));
}

#[test]
fn zero_attempts_is_a_configuration_error() {
    let gemini = FlakyProvider::new(ProviderKind::Gemini, 0, server_error);
    let err = Orchestrator::builder()
        .provider(gemini)
        .retry(RetryConfig::new().max_attempts(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, NutrigateError::Configuration(_)));
}
