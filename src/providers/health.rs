//! Rolling per-provider health window.
//!
//! [`HealthMonitor`] keeps the last N invocation outcomes per provider
//! (default 100), discarding samples older than the retention period
//! (default 24 hours). The router turns the resulting [`ProviderHealth`]
//! into a score multiplier.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::types::ProviderKind;

/// Health multiplier floor; no provider is excluded by health alone.
pub const MIN_HEALTH_FACTOR: f64 = 0.1;

const SLOW_RESPONSE_MS: f64 = 10_000.0;
const VERY_SLOW_RESPONSE_MS: f64 = 20_000.0;

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    success: bool,
    duration: Duration,
}

/// Health summary derived from the current window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProviderHealth {
    /// Share of successful invocations, in `[0, 1]`. 1.0 with no samples.
    pub recent_success_rate: f64,
    pub avg_response_time_ms: f64,
    pub sample_count: usize,
}

impl ProviderHealth {
    /// Health of a provider with no recorded samples.
    pub fn unknown() -> Self {
        Self {
            recent_success_rate: 1.0,
            avg_response_time_ms: 0.0,
            sample_count: 0,
        }
    }

    /// Score multiplier in `[0.1, 1.0]`.
    ///
    /// Starts at the success rate, then is scaled by 0.8 when responses
    /// average over 10s or by 0.6 when they average over 20s.
    pub fn factor(&self) -> f64 {
        if self.sample_count == 0 {
            return 1.0;
        }
        let mut factor = self.recent_success_rate;
        if self.avg_response_time_ms > VERY_SLOW_RESPONSE_MS {
            factor *= 0.6;
        } else if self.avg_response_time_ms > SLOW_RESPONSE_MS {
            factor *= 0.8;
        }
        factor.clamp(MIN_HEALTH_FACTOR, 1.0)
    }
}

/// Thread-safe rolling window of invocation outcomes per provider.
#[derive(Debug)]
pub struct HealthMonitor {
    windows: Mutex<HashMap<ProviderKind, VecDeque<Sample>>>,
    window_size: usize,
    retention: Duration,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(24 * 3600))
    }
}

impl HealthMonitor {
    pub fn new(window_size: usize, retention: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_size: window_size.max(1),
            retention,
        }
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<ProviderKind, VecDeque<Sample>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_success(&self, provider: ProviderKind, duration: Duration) {
        self.record(provider, true, duration);
    }

    pub fn record_failure(&self, provider: ProviderKind, duration: Duration) {
        self.record(provider, false, duration);
    }

    fn record(&self, provider: ProviderKind, success: bool, duration: Duration) {
        let now = Instant::now();
        let mut windows = self.windows();
        let window = windows.entry(provider).or_default();
        window.push_back(Sample {
            at: now,
            success,
            duration,
        });
        while window.len() > self.window_size {
            window.pop_front();
        }
        prune(window, now, self.retention);
    }

    /// Current health of one provider.
    pub fn health(&self, provider: ProviderKind) -> ProviderHealth {
        let now = Instant::now();
        let mut windows = self.windows();
        let Some(window) = windows.get_mut(&provider) else {
            return ProviderHealth::unknown();
        };
        prune(window, now, self.retention);
        if window.is_empty() {
            return ProviderHealth::unknown();
        }

        let count = window.len();
        let successes = window.iter().filter(|s| s.success).count();
        let total_ms: f64 = window
            .iter()
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .sum();
        ProviderHealth {
            recent_success_rate: successes as f64 / count as f64,
            avg_response_time_ms: total_ms / count as f64,
            sample_count: count,
        }
    }

    /// Health of every provider that has samples.
    pub fn snapshot(&self) -> HashMap<ProviderKind, ProviderHealth> {
        let providers: Vec<ProviderKind> = self.windows().keys().copied().collect();
        providers
            .into_iter()
            .map(|p| (p, self.health(p)))
            .filter(|(_, h)| h.sample_count > 0)
            .collect()
    }
}

fn prune(window: &mut VecDeque<Sample>, now: Instant, retention: Duration) {
    while let Some(front) = window.front() {
        if now.duration_since(front.at) > retention {
            window.pop_front();
        } else {
            break;
        }
    }
}
