//! Telemetry metric name constants.
//!
//! Centralised metric names for nutrigate operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `nutrigate_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (`openai`, `anthropic`, `gemini`)
//! - `task_type`: analysis task (e.g. `food_recognition`)
//! - `status`: outcome: "ok" or "error"

/// Total provider attempts dispatched by the orchestrator.
///
/// Labels: `provider`, `task_type`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "nutrigate_requests_total";

/// Provider attempt duration in seconds.
///
/// Labels: `provider`, `task_type`.
pub const REQUEST_DURATION_SECONDS: &str = "nutrigate_request_duration_seconds";

/// Total retry attempts on the primary provider (not counting the first try).
///
/// Labels: `provider`, `task_type`, `transient` ("true" | "false").
pub const RETRIES_TOTAL: &str = "nutrigate_retries_total";

/// Total fallback attempts (providers tried after the primary gave up).
///
/// Labels: `provider`, `task_type`.
pub const FALLBACKS_TOTAL: &str = "nutrigate_fallbacks_total";

/// Total result cache hits.
///
/// Labels: `task_type`.
pub const CACHE_HITS_TOTAL: &str = "nutrigate_cache_hits_total";

/// Total result cache misses.
///
/// Labels: `task_type`.
pub const CACHE_MISSES_TOTAL: &str = "nutrigate_cache_misses_total";

/// Total entries evicted to respect the cache capacity.
pub const CACHE_EVICTIONS_TOTAL: &str = "nutrigate_cache_evictions_total";

/// Total provider spend in micro-USD.
///
/// Labels: `provider`, `task_type`.
pub const COST_MICRO_USD_TOTAL: &str = "nutrigate_cost_micro_usd_total";

/// Total budget alerts raised.
///
/// Labels: `kind` ("daily" | "daily_exceeded" | "monthly" | "monthly_exceeded").
pub const COST_ALERTS_TOTAL: &str = "nutrigate_cost_alerts_total";
