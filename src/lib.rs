//! Nutrigate - AI provider orchestration for nutrition and health analysis
//!
//! This crate routes food recognition, dietary inflammatory index (DII)
//! calculation, health risk assessment, and risk signal detection across
//! OpenAI, Anthropic, and Gemini. Every request goes through a shared
//! pipeline: result cache, weighted provider selection, retry with backoff,
//! fallback to the next provider, and per-requester cost accounting with
//! budget alerts.
//!
//! # Example
//!
//! ```rust,no_run
//! use nutrigate::{Language, Orchestrator, SelectionCriteria};
//!
//! #[tokio::main]
//! async fn main() -> nutrigate::Result<()> {
//!     let orchestrator = Orchestrator::builder()
//!         .openai("sk-...")
//!         .anthropic("sk-ant-...")
//!         .gemini("AIza...")
//!         .build()?;
//!
//!     let result = orchestrator
//!         .analyze_food(
//!             "grilled salmon with brown rice and miso soup",
//!             "customer-42",
//!             SelectionCriteria::new().language(Language::English),
//!         )
//!         .await?;
//!
//!     println!("{} answered in {}ms", result.provider_id, result.processing_time_ms);
//!     Ok(())
//! }
//! ```
//!
//! # Cost tracking
//!
//! ```rust
//! use nutrigate::{CostLimits, CostTracker, ProviderKind, TaskType};
//!
//! let tracker = CostTracker::new(CostLimits::new(50.0, 1000.0));
//! tracker
//!     .record_usage(ProviderKind::Gemini, 0.005, "customer-42", TaskType::FoodRecognition)
//!     .unwrap();
//! assert!((tracker.today_cost() - 0.005).abs() < 1e-12);
//! ```

pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod telemetry;
pub mod types;
mod version;

// Re-export main types at crate root
pub use error::{NutrigateError, Result};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};

pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use config::{Config, Secrets};
pub use cost::{
    AlertKind, AlertSeverity, AlertSink, CostAlert, CostLimits, CostSummary, CostTracker,
    LogAlertSink, UsageRecord,
};
pub use providers::{
    AnalysisProvider, Backoff, HealthMonitor, LlmAnalysisProvider, ProviderHealth,
    ProviderProfile, ProviderResponse, ProviderRouter, RetryConfig, RoutingConfig,
};

// Re-export all types
pub use types::{
    Accuracy, AnalysisOutput, AnalysisPayload, AnalysisRequest, AnalysisResult, Complexity,
    DiiComponent, DiiScore, FoodAnalysis, FoodItem, HealthProfile, HealthRecord,
    HealthRiskAssessment, InflammationLevel, Language, ProviderKind, RiskLevel, RiskSignal,
    RiskSignals, SelectionCriteria, TaskType, Urgency,
};

pub use version::{BuildInfo, PKG_VERSION, version_string};
