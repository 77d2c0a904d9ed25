//! Usage ledger, spend aggregates, and budget alerts.
//!
//! Every paid provider invocation appends one [`UsageRecord`] to the
//! [`CostTracker`]. Cache hits record nothing. Daily and monthly totals are
//! derived from the ledger per UTC calendar bucket and memoized until the
//! next write into that bucket.
//!
//! Budgets are alert-only: crossing a threshold raises a [`CostAlert`] but
//! never blocks a request.

pub mod alert;
pub mod summary;
pub mod tracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProviderKind, TaskType};

pub use alert::{AlertKind, AlertSeverity, AlertSink, CostAlert, LogAlertSink};
pub use summary::CostSummary;
pub use tracker::CostTracker;

/// Daily and monthly spend ceilings in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostLimits {
    pub daily_limit_usd: f64,
    pub monthly_limit_usd: f64,
}

impl Default for CostLimits {
    fn default() -> Self {
        Self {
            daily_limit_usd: 50.0,
            monthly_limit_usd: 1000.0,
        }
    }
}

impl CostLimits {
    pub fn new(daily_limit_usd: f64, monthly_limit_usd: f64) -> Self {
        Self {
            daily_limit_usd,
            monthly_limit_usd,
        }
    }
}

/// One paid provider invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub requester_id: String,
    pub provider_id: ProviderKind,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
    pub task_type: TaskType,
}

impl UsageRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        provider_id: ProviderKind,
        cost_usd: f64,
        requester_id: impl Into<String>,
        task_type: TaskType,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            provider_id,
            cost_usd,
            timestamp: Utc::now(),
            task_type,
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn micro_usd(&self) -> u64 {
        to_micro_usd(self.cost_usd)
    }
}

/// Costs are summed in whole micro-dollars so totals are exact and
/// independent of record order.
pub(crate) fn to_micro_usd(cost: f64) -> u64 {
    (cost * 1_000_000.0).round() as u64
}

pub(crate) fn from_micro_usd(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}
