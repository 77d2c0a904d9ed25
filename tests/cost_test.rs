//! Tests for the cost tracker: calendar aggregates, budget alerts,
//! summaries, and ledger persistence.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use nutrigate::{
    AlertKind, AlertSeverity, AlertSink, CacheStats, CostAlert, CostLimits, CostTracker,
    NutrigateError, ProviderKind, Result, TaskType, UsageRecord,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

fn usage(provider: ProviderKind, cost: f64, requester: &str) -> UsageRecord {
    UsageRecord::new(provider, cost, requester, TaskType::FoodRecognition)
}

#[derive(Default)]
struct CollectingSink {
    alerts: Mutex<Vec<CostAlert>>,
}

impl AlertSink for CollectingSink {
    fn notify(&self, alert: &CostAlert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct FailingSink {
    calls: AtomicU32,
}

impl AlertSink for FailingSink {
    fn notify(&self, _alert: &CostAlert) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(NutrigateError::Http("webhook unreachable".into()))
    }
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn aggregates_use_utc_calendar_buckets() {
    let tracker = CostTracker::default();
    tracker
        .record(usage(ProviderKind::OpenAi, 1.0, "a").at(at(14, 23)))
        .unwrap();
    tracker
        .record(usage(ProviderKind::OpenAi, 2.0, "a").at(at(15, 0)))
        .unwrap();
    tracker
        .record(
            usage(ProviderKind::Gemini, 4.0, "b")
                .at(Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap()),
        )
        .unwrap();

    assert_eq!(tracker.daily_cost(date(3, 14)), 1.0);
    assert_eq!(tracker.daily_cost(date(3, 15)), 2.0);
    assert_eq!(tracker.daily_cost(date(3, 16)), 0.0);
    assert_eq!(tracker.monthly_cost(date(3, 1)), 3.0);
    assert_eq!(tracker.monthly_cost(date(2, 10)), 4.0);
}

#[test]
fn aggregates_do_not_depend_on_arrival_order() {
    // 0.1 + 0.2 + 0.3 differs from 0.3 + 0.2 + 0.1 in plain f64 addition
    let records = [
        usage(ProviderKind::OpenAi, 0.1, "a").at(at(3, 9)),
        usage(ProviderKind::Anthropic, 0.2, "b").at(at(3, 10)),
        usage(ProviderKind::Gemini, 0.3, "a").at(at(3, 11)),
        usage(ProviderKind::Gemini, 0.125, "a").at(at(4, 11)),
    ];

    let forward = CostTracker::default();
    for r in records.iter().cloned() {
        forward.record(r).unwrap();
    }
    let backward = CostTracker::default();
    for r in records.iter().rev().cloned() {
        backward.record(r).unwrap();
    }

    for day in [date(3, 3), date(3, 4)] {
        assert_eq!(forward.daily_cost(day), backward.daily_cost(day));
    }
    assert_eq!(forward.daily_cost(date(3, 3)), 0.6);
    assert_eq!(backward.daily_cost(date(3, 3)), 0.6);
    assert_eq!(forward.monthly_cost(date(3, 1)), 0.725);
    assert_eq!(backward.monthly_cost(date(3, 1)), 0.725);
}

#[test]
fn remaining_budget_never_goes_negative() {
    let tracker = CostTracker::new(CostLimits::new(1.0, 10.0));
    tracker
        .record_usage(ProviderKind::Anthropic, 1.5, "a", TaskType::HealthAssessment)
        .unwrap();

    assert_eq!(tracker.remaining_daily_budget(), 0.0);
    assert_eq!(tracker.remaining_monthly_budget(), 8.5);
    assert_eq!(tracker.daily_budget_ratio(), 0.0);
}

// ============================================================================
// Alerts
// ============================================================================

#[test]
fn daily_alert_then_exceeded_fire_once_each() {
    let sink = Arc::new(CollectingSink::default());
    let tracker = CostTracker::new(CostLimits::new(50.0, 1000.0)).with_sink(sink.clone());

    // $45 of $50 crosses the 80% threshold.
    for hour in 0..9 {
        tracker
            .record(usage(ProviderKind::OpenAi, 5.0, "a").at(at(14, hour)))
            .unwrap();
    }
    // $51 exceeds the limit; more spend raises nothing new.
    for (hour, cost) in [(10, 6.0), (11, 5.0), (12, 5.0)] {
        tracker
            .record(usage(ProviderKind::OpenAi, cost, "a").at(at(14, hour)))
            .unwrap();
    }

    let alerts = sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].kind, AlertKind::Daily);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    assert_eq!(alerts[0].period, "2026-03-14");
    assert_eq!(alerts[0].current_cost_usd, 45.0);
    assert_eq!(alerts[1].kind, AlertKind::DailyExceeded);
    assert_eq!(alerts[1].severity, AlertSeverity::Urgent);
    assert_eq!(alerts[1].current_cost_usd, 51.0);
    assert_eq!(tracker.alerts().len(), 2);
}

#[test]
fn alerts_rearm_for_the_next_day() {
    let sink = Arc::new(CollectingSink::default());
    let tracker = CostTracker::new(CostLimits::new(10.0, 1000.0)).with_sink(sink.clone());

    tracker
        .record(usage(ProviderKind::Gemini, 9.0, "a").at(at(14, 12)))
        .unwrap();
    tracker
        .record(usage(ProviderKind::Gemini, 9.0, "a").at(at(15, 12)))
        .unwrap();

    let periods: Vec<_> = sink
        .alerts
        .lock()
        .unwrap()
        .iter()
        .map(|a| (a.kind, a.period.clone()))
        .collect();
    assert_eq!(
        periods,
        vec![
            (AlertKind::Daily, "2026-03-14".to_string()),
            (AlertKind::Daily, "2026-03-15".to_string()),
        ]
    );
}

#[test]
fn monthly_alerts_use_month_period() {
    let sink = Arc::new(CollectingSink::default());
    let tracker = CostTracker::new(CostLimits::new(0.0, 100.0)).with_sink(sink.clone());

    tracker
        .record(usage(ProviderKind::Anthropic, 95.0, "a").at(at(2, 8)))
        .unwrap();
    tracker
        .record(usage(ProviderKind::Anthropic, 10.0, "a").at(at(20, 8)))
        .unwrap();

    let alerts = sink.alerts.lock().unwrap();
    let kinds: Vec<_> = alerts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AlertKind::Monthly, AlertKind::MonthlyExceeded]);
    assert!(alerts.iter().all(|a| a.period == "2026-03"));
}

#[test]
fn failing_sink_does_not_fail_recording() {
    let sink = Arc::new(FailingSink {
        calls: AtomicU32::new(0),
    });
    let tracker = CostTracker::new(CostLimits::new(1.0, 1000.0)).with_sink(sink.clone());

    tracker
        .record_usage(ProviderKind::OpenAi, 2.0, "a", TaskType::FoodRecognition)
        .unwrap();

    assert_eq!(tracker.len(), 1);
    // Daily and daily-exceeded both crossed on the same write.
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.alerts().len(), 2);
}

// ============================================================================
// Summaries and suggestions
// ============================================================================

#[test]
fn summary_breaks_down_by_provider_and_requester() {
    let tracker = CostTracker::new(CostLimits::new(50.0, 1000.0));
    tracker
        .record_usage(ProviderKind::OpenAi, 0.5, "alice", TaskType::FoodRecognition)
        .unwrap();
    tracker
        .record_usage(ProviderKind::Anthropic, 1.5, "alice", TaskType::DiiCalculation)
        .unwrap();
    tracker
        .record_usage(ProviderKind::Anthropic, 2.0, "bob", TaskType::HealthAssessment)
        .unwrap();

    let summary = tracker.cost_summary(7);
    assert_eq!(summary.record_count, 3);
    assert_eq!(summary.today_usd, 4.0);
    assert_eq!(summary.window_total_usd, 4.0);
    assert_eq!(summary.by_provider[&ProviderKind::Anthropic], 3.5);
    assert_eq!(summary.by_provider[&ProviderKind::OpenAi], 0.5);
    assert_eq!(summary.by_requester["alice"], 2.0);
    assert_eq!(summary.by_requester["bob"], 2.0);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["by_provider"]["anthropic"], 3.5);
}

#[test]
fn suggestions_flag_skew_and_poor_cache_use() {
    let tracker = CostTracker::new(CostLimits::new(50.0, 1000.0));
    for _ in 0..4 {
        tracker
            .record_usage(ProviderKind::Anthropic, 1.0, "a", TaskType::HealthAssessment)
            .unwrap();
    }
    tracker
        .record_usage(ProviderKind::Gemini, 1.0, "a", TaskType::FoodRecognition)
        .unwrap();

    let stats = CacheStats {
        size: 10,
        capacity: 1000,
        hits: 5,
        misses: 95,
        evictions: 0,
        hit_rate: 0.05,
    };
    let suggestions = tracker.optimization_suggestions(Some(&stats));
    assert!(suggestions.iter().any(|s| s.starts_with("anthropic accounts for 80%")));
    assert!(suggestions.iter().any(|s| s.starts_with("cache hit rate is 5%")));

    assert!(CostTracker::default().optimization_suggestions(None).is_empty());
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn export_import_restores_aggregates_without_alerts() {
    let source = CostTracker::new(CostLimits::new(1.0, 1000.0));
    source
        .record(usage(ProviderKind::OpenAi, 0.75, "a").at(at(14, 8)))
        .unwrap();
    source
        .record(usage(ProviderKind::Gemini, 0.5, "b").at(at(14, 9)))
        .unwrap();
    let json = source.export_json().unwrap();

    let sink = Arc::new(CollectingSink::default());
    let restored = CostTracker::new(CostLimits::new(1.0, 1000.0)).with_sink(sink.clone());
    assert_eq!(restored.import_json(&json).unwrap(), 2);

    assert_eq!(restored.records(), source.records());
    assert_eq!(restored.daily_cost(date(3, 14)), 1.25);
    assert!(sink.alerts.lock().unwrap().is_empty());
}

#[test]
fn import_rejects_invalid_records_atomically() {
    let tracker = CostTracker::default();
    let json = r#"[
        {"requester_id": "a", "provider_id": "openai", "cost_usd": 0.5,
         "timestamp": "2026-03-14T08:00:00Z", "task_type": "food_recognition"},
        {"requester_id": "a", "provider_id": "openai", "cost_usd": -1.0,
         "timestamp": "2026-03-14T09:00:00Z", "task_type": "food_recognition"}
    ]"#;

    let err = tracker.import_json(json).unwrap_err();
    assert!(matches!(err, NutrigateError::InvalidInput(_)));
    assert!(tracker.is_empty());
    assert!(tracker.import_json("not json").is_err());
}

#[test]
fn reset_clears_ledger_and_alert_state() {
    let tracker = CostTracker::new(CostLimits::new(1.0, 1000.0));
    tracker
        .record_usage(ProviderKind::OpenAi, 0.9, "a", TaskType::FoodRecognition)
        .unwrap();
    assert_eq!(tracker.alerts().len(), 1);

    tracker.reset();
    assert!(tracker.is_empty());
    assert!(tracker.alerts().is_empty());
    assert_eq!(tracker.today_cost(), 0.0);

    // Thresholds fire again after a reset.
    tracker
        .record_usage(ProviderKind::OpenAi, 0.9, "a", TaskType::FoodRecognition)
        .unwrap();
    assert_eq!(tracker.alerts().len(), 1);
}
