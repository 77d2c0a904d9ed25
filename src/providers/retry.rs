//! Retry configuration, delay calculation, and the bounded attempt helpers.
//!
//! [`RetryConfig`] controls how often the primary provider is retried before
//! the orchestrator falls through to the fallback chain. Delays grow
//! monotonically (linear by default) and a provider `retry_after` hint can
//! lengthen a delay but never shorten it.
//!
//! All provider calls go through [`attempt`], which bounds each call by the
//! provider's timeout and aborts it on cancellation. [`with_retry`] loops
//! over `attempt`, keeping retry logic in a single place.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::telemetry;
use crate::types::{ProviderKind, TaskType};
use crate::{NutrigateError, Result};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `initial_delay * (attempt + 1)`: 1s, 2s, 3s, ...
    #[default]
    Linear,
    /// `initial_delay * 2^attempt`: 1s, 2s, 4s, ...
    Exponential,
}

/// Configuration for retrying the primary provider.
///
/// ```rust
/// # use nutrigate::{Backoff, RetryConfig};
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .backoff(Backoff::Exponential);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum computed delay between retries. Default: 30s.
    pub max_delay: Duration,
    /// Delay growth. Default: linear.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Linear,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum computed delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Calculate the delay after a failed attempt (0-indexed), capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Linear => self.initial_delay.saturating_mul(attempt.saturating_add(1)),
            Backoff::Exponential => self
                .initial_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting provider `retry_after` hints.
    ///
    /// A hint longer than the computed backoff wins; a shorter one is ignored.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.delay_for_attempt(attempt);
        match retry_after {
            Some(hint) => computed.max(hint),
            None => computed,
        }
    }
}

// ============================================================================
// Attempt helpers
// ============================================================================

/// Run one provider call, bounded by `timeout` and aborted by `cancel`.
pub(crate) async fn attempt<Fut, T>(
    timeout: Duration,
    cancel: &CancellationToken,
    call: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NutrigateError::Cancelled),
        outcome = tokio::time::timeout(timeout, call) => {
            outcome.unwrap_or(Err(NutrigateError::Timeout(timeout)))
        }
    }
}

/// Execute an operation with retry logic.
///
/// Every failure except cancellation is retried up to `config.max_attempts`;
/// whether the error was transient is logged and counted. `attempts` is
/// incremented once per call of `f`.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider: ProviderKind,
    task: TaskType,
    cancel: &CancellationToken,
    attempts: &mut u32,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 0..max_attempts {
        *attempts += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(NutrigateError::Cancelled) => return Err(NutrigateError::Cancelled),
            Err(e) => {
                if attempt + 1 < max_attempts {
                    let transient = e.is_transient();
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider.as_str(),
                        "task_type" => task.as_str(),
                        "transient" => if transient { "true" } else { "false" },
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider.as_str(),
                        task_type = task.as_str(),
                        attempt = attempt + 1,
                        max_attempts,
                        transient,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after provider error"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(NutrigateError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(NutrigateError::NoProvider))
}
