//! Spend reporting and advisory suggestions derived from the ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::{CostLimits, UsageRecord, from_micro_usd};
use crate::cache::CacheStats;
use crate::types::ProviderKind;

/// Provider share of monthly spend above which a skew suggestion is made.
const PROVIDER_SKEW_SHARE: f64 = 0.6;
/// Daily spend share above which a budget-pressure suggestion is made.
const DAILY_PRESSURE_SHARE: f64 = 0.8;
/// Hit rate below which a cache suggestion is made.
const LOW_HIT_RATE: f64 = 0.3;
/// Lookups required before the hit rate is considered meaningful.
const MIN_LOOKUPS_FOR_HIT_RATE: u64 = 20;

/// Spend report over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub generated_at: DateTime<Utc>,
    pub window_days: u32,
    pub today_usd: f64,
    pub last_7_days_usd: f64,
    pub this_month_usd: f64,
    pub window_total_usd: f64,
    pub record_count: usize,
    pub by_provider: BTreeMap<ProviderKind, f64>,
    pub by_requester: BTreeMap<String, f64>,
    pub daily_limit_usd: f64,
    pub monthly_limit_usd: f64,
    pub remaining_daily_usd: f64,
    pub remaining_monthly_usd: f64,
}

pub(crate) fn summarize(
    records: &[UsageRecord],
    now: DateTime<Utc>,
    window_days: u32,
    limits: &CostLimits,
) -> CostSummary {
    let today = now.date_naive();
    let week_start = today - Duration::days(6);
    let window_start = now - Duration::days(i64::from(window_days));

    let mut today_micros = 0u64;
    let mut week_micros = 0u64;
    let mut month_micros = 0u64;
    let mut window_micros = 0u64;
    let mut record_count = 0;
    let mut by_provider: BTreeMap<ProviderKind, u64> = BTreeMap::new();
    let mut by_requester: BTreeMap<String, u64> = BTreeMap::new();

    for record in records {
        let day = record.timestamp.date_naive();
        let micros = record.micro_usd();
        if day == today {
            today_micros += micros;
        }
        if day >= week_start && day <= today {
            week_micros += micros;
        }
        if same_month(day, today) {
            month_micros += micros;
        }
        if record.timestamp >= window_start && record.timestamp <= now {
            window_micros += micros;
            record_count += 1;
            *by_provider.entry(record.provider_id).or_default() += micros;
            *by_requester
                .entry(record.requester_id.clone())
                .or_default() += micros;
        }
    }

    let today_usd = from_micro_usd(today_micros);
    let this_month_usd = from_micro_usd(month_micros);
    CostSummary {
        generated_at: now,
        window_days,
        today_usd,
        last_7_days_usd: from_micro_usd(week_micros),
        this_month_usd,
        window_total_usd: from_micro_usd(window_micros),
        record_count,
        by_provider: to_usd(by_provider),
        by_requester: to_usd(by_requester),
        daily_limit_usd: limits.daily_limit_usd,
        monthly_limit_usd: limits.monthly_limit_usd,
        remaining_daily_usd: (limits.daily_limit_usd - today_usd).max(0.0),
        remaining_monthly_usd: (limits.monthly_limit_usd - this_month_usd).max(0.0),
    }
}

fn to_usd<K: Ord>(micros: BTreeMap<K, u64>) -> BTreeMap<K, f64> {
    micros
        .into_iter()
        .map(|(key, total)| (key, from_micro_usd(total)))
        .collect()
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub(crate) fn suggestions(
    records: &[UsageRecord],
    now: DateTime<Utc>,
    limits: &CostLimits,
    cache: Option<&CacheStats>,
) -> Vec<String> {
    let summary = summarize(records, now, 0, limits);
    let mut out = Vec::new();

    if summary.this_month_usd > 0.0 {
        let mut by_provider: BTreeMap<ProviderKind, u64> = BTreeMap::new();
        let today = now.date_naive();
        for record in records {
            if same_month(record.timestamp.date_naive(), today) {
                *by_provider.entry(record.provider_id).or_default() += record.micro_usd();
            }
        }
        for (provider, spent) in to_usd(by_provider) {
            let share = spent / summary.this_month_usd;
            if share > PROVIDER_SKEW_SHARE {
                out.push(format!(
                    "{provider} accounts for {:.0}% of this month's spend; route low-complexity \
                     food recognition to a cheaper provider",
                    share * 100.0
                ));
            }
        }
    }

    if limits.daily_limit_usd > 0.0
        && summary.today_usd > limits.daily_limit_usd * DAILY_PRESSURE_SHARE
    {
        out.push(format!(
            "today's spend is at {:.0}% of the daily limit; defer non-urgent analyses or \
             raise the limit",
            summary.today_usd / limits.daily_limit_usd * 100.0
        ));
    }

    if let Some(stats) = cache
        && stats.hits + stats.misses >= MIN_LOOKUPS_FOR_HIT_RATE
        && stats.hit_rate < LOW_HIT_RATE
    {
        out.push(format!(
            "cache hit rate is {:.0}%; consider longer TTLs for food recognition and DII results",
            stats.hit_rate * 100.0
        ));
    }

    out
}
