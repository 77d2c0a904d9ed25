//! The cost tracker: append-only ledger with memoized calendar aggregates.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Datelike, NaiveDate, Utc};
use moka::sync::Cache;
use tracing::{debug, warn};

use super::alert::{AlertKind, AlertSink, CostAlert, LogAlertSink};
use super::summary::{self, CostSummary};
use super::{CostLimits, UsageRecord, from_micro_usd, to_micro_usd};
use crate::cache::CacheStats;
use crate::telemetry;
use crate::types::{ProviderKind, TaskType};
use crate::{NutrigateError, Result};

/// Number of calendar buckets kept in the aggregate memo.
const MEMO_CAPACITY: u64 = 512;

#[derive(Default)]
struct AlertState {
    fired: HashSet<(AlertKind, String)>,
    history: Vec<CostAlert>,
}

/// Records provider spend and raises budget alerts.
///
/// All methods take `&self`; share the tracker via `Arc`.
///
/// ```rust
/// # use nutrigate::{CostLimits, CostTracker, ProviderKind, TaskType};
/// let tracker = CostTracker::new(CostLimits::new(10.0, 200.0));
/// tracker
///     .record_usage(ProviderKind::Gemini, 0.005, "cust-1", TaskType::FoodRecognition)
///     .unwrap();
/// assert!(tracker.remaining_daily_budget() < 10.0);
/// ```
pub struct CostTracker {
    limits: CostLimits,
    ledger: RwLock<Vec<UsageRecord>>,
    /// Aggregates keyed `daily:YYYY-MM-DD` / `monthly:YYYY-MM`.
    memo: Cache<String, f64>,
    alerts: Mutex<AlertState>,
    sink: Arc<dyn AlertSink>,
}

impl CostTracker {
    /// Create a tracker that logs alerts via `tracing`.
    pub fn new(limits: CostLimits) -> Self {
        Self {
            limits,
            ledger: RwLock::new(Vec::new()),
            memo: Cache::new(MEMO_CAPACITY),
            alerts: Mutex::new(AlertState::default()),
            sink: Arc::new(LogAlertSink),
        }
    }

    /// Deliver alerts to `sink` instead of the log.
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn limits(&self) -> CostLimits {
        self.limits
    }

    // ===== Lock helpers =====
    //
    // Every critical section leaves the ledger consistent, so poisoned locks
    // are recovered rather than propagated.

    fn read_ledger(&self) -> RwLockReadGuard<'_, Vec<UsageRecord>> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_ledger(&self) -> RwLockWriteGuard<'_, Vec<UsageRecord>> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn alert_state(&self) -> MutexGuard<'_, AlertState> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Writes =====

    /// Append a usage record stamped now, then evaluate alerts.
    pub fn record_usage(
        &self,
        provider_id: ProviderKind,
        cost_usd: f64,
        requester_id: &str,
        task_type: TaskType,
    ) -> Result<()> {
        self.record(UsageRecord::new(
            provider_id,
            cost_usd,
            requester_id,
            task_type,
        ))
    }

    /// Append a usage record with its own timestamp, then evaluate alerts
    /// for the day and month it falls in.
    pub fn record(&self, record: UsageRecord) -> Result<()> {
        validate_cost(record.cost_usd)?;
        let day = record.timestamp.date_naive();
        let provider = record.provider_id;
        let task = record.task_type;
        let cost = record.cost_usd;

        {
            let mut ledger = self.write_ledger();
            ledger.push(record);
            self.invalidate(day);
        }

        metrics::counter!(telemetry::COST_MICRO_USD_TOTAL,
            "provider" => provider.as_str(),
            "task_type" => task.as_str(),
        )
        .increment(to_micro_usd(cost));
        debug!(provider = %provider, cost_usd = cost, %day, "usage recorded");

        self.evaluate_alerts(day);
        Ok(())
    }

    fn invalidate(&self, day: NaiveDate) {
        self.memo.invalidate(&daily_key(day));
        self.memo.invalidate(&monthly_key(day));
    }

    // ===== Aggregates =====

    /// Total spend on the UTC calendar day `day`.
    pub fn daily_cost(&self, day: NaiveDate) -> f64 {
        let key = daily_key(day);
        let ledger = self.read_ledger();
        if let Some(total) = self.memo.get(&key) {
            return total;
        }
        let total = from_micro_usd(
            ledger
                .iter()
                .filter(|r| r.timestamp.date_naive() == day)
                .map(UsageRecord::micro_usd)
                .sum(),
        );
        self.memo.insert(key, total);
        total
    }

    /// Total spend in the UTC calendar month containing `day`.
    pub fn monthly_cost(&self, day: NaiveDate) -> f64 {
        let key = monthly_key(day);
        let ledger = self.read_ledger();
        if let Some(total) = self.memo.get(&key) {
            return total;
        }
        let total = from_micro_usd(
            ledger
                .iter()
                .filter(|r| same_month(r.timestamp.date_naive(), day))
                .map(UsageRecord::micro_usd)
                .sum(),
        );
        self.memo.insert(key, total);
        total
    }

    pub fn today_cost(&self) -> f64 {
        self.daily_cost(Utc::now().date_naive())
    }

    pub fn month_to_date_cost(&self) -> f64 {
        self.monthly_cost(Utc::now().date_naive())
    }

    /// `max(0, daily_limit - today's spend)`.
    pub fn remaining_daily_budget(&self) -> f64 {
        (self.limits.daily_limit_usd - self.today_cost()).max(0.0)
    }

    /// `max(0, monthly_limit - this month's spend)`.
    pub fn remaining_monthly_budget(&self) -> f64 {
        (self.limits.monthly_limit_usd - self.month_to_date_cost()).max(0.0)
    }

    /// Remaining daily budget as a fraction of the daily limit, in `[0, 1]`.
    ///
    /// A non-positive limit means no daily budget, reported as 1.0.
    pub fn daily_budget_ratio(&self) -> f64 {
        if self.limits.daily_limit_usd <= 0.0 {
            return 1.0;
        }
        (self.remaining_daily_budget() / self.limits.daily_limit_usd).clamp(0.0, 1.0)
    }

    // ===== Alerts =====

    fn evaluate_alerts(&self, day: NaiveDate) {
        let daily = self.daily_cost(day);
        let monthly = self.monthly_cost(day);

        for kind in AlertKind::ALL {
            let (current, limit, period) = if kind.is_daily() {
                (daily, self.limits.daily_limit_usd, day.format("%Y-%m-%d").to_string())
            } else {
                (monthly, self.limits.monthly_limit_usd, day.format("%Y-%m").to_string())
            };
            if limit <= 0.0 || current <= limit * kind.threshold() {
                continue;
            }

            let alert = {
                let mut state = self.alert_state();
                if !state.fired.insert((kind, period.clone())) {
                    continue;
                }
                let alert = CostAlert {
                    kind,
                    severity: kind.severity(),
                    period,
                    current_cost_usd: current,
                    limit_usd: limit,
                    raised_at: Utc::now(),
                };
                state.history.push(alert.clone());
                alert
            };

            metrics::counter!(telemetry::COST_ALERTS_TOTAL, "kind" => kind.as_str()).increment(1);
            if let Err(e) = self.sink.notify(&alert) {
                warn!(kind = kind.as_str(), error = %e, "failed to deliver budget alert");
            }
        }
    }

    /// Alerts raised so far, oldest first.
    pub fn alerts(&self) -> Vec<CostAlert> {
        self.alert_state().history.clone()
    }

    // ===== Reporting =====

    /// Spend report covering the last `window_days` days.
    pub fn cost_summary(&self, window_days: u32) -> CostSummary {
        let ledger = self.read_ledger();
        summary::summarize(&ledger, Utc::now(), window_days, &self.limits)
    }

    /// Advisory suggestions for reducing spend.
    pub fn optimization_suggestions(&self, cache: Option<&CacheStats>) -> Vec<String> {
        let ledger = self.read_ledger();
        summary::suggestions(&ledger, Utc::now(), &self.limits, cache)
    }

    /// Snapshot of the ledger.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.read_ledger().clone()
    }

    pub fn len(&self) -> usize {
        self.read_ledger().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the ledger, the memo, and alert state.
    pub fn reset(&self) {
        let mut ledger = self.write_ledger();
        ledger.clear();
        self.memo.invalidate_all();
        let mut state = self.alert_state();
        state.fired.clear();
        state.history.clear();
    }

    // ===== Persistence =====

    /// Serialize the ledger as a JSON array.
    pub fn export_json(&self) -> Result<String> {
        let ledger = self.read_ledger();
        Ok(serde_json::to_string_pretty(&*ledger)?)
    }

    /// Append records from a JSON array produced by [`export_json`](Self::export_json).
    ///
    /// Imported records are history: they update aggregates but raise no
    /// alerts. Returns the number of records imported. Nothing is imported
    /// if any record is invalid.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let records: Vec<UsageRecord> = serde_json::from_str(json)?;
        for record in &records {
            validate_cost(record.cost_usd)?;
        }

        let count = records.len();
        let mut ledger = self.write_ledger();
        for record in records {
            self.invalidate(record.timestamp.date_naive());
            ledger.push(record);
        }
        debug!(count, "imported usage records");
        Ok(count)
    }
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new(CostLimits::default())
    }
}

impl std::fmt::Debug for CostTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostTracker")
            .field("limits", &self.limits)
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}

fn validate_cost(cost: f64) -> Result<()> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(())
    } else {
        Err(NutrigateError::InvalidInput(format!(
            "usage cost must be a non-negative finite amount, got {cost}"
        )))
    }
}

fn daily_key(day: NaiveDate) -> String {
    format!("daily:{}", day.format("%Y-%m-%d"))
}

fn monthly_key(day: NaiveDate) -> String {
    format!("monthly:{}", day.format("%Y-%m"))
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}
