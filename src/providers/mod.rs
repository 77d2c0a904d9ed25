//! Provider adapters and the machinery for choosing between them.
//!
//! - [`traits`]: the [`AnalysisProvider`] contract every backend implements
//! - [`llm_analysis`]: [`LlmAnalysisProvider`], the adapter backed by the `llm` crate
//! - [`profile`]: static cost, latency, and strength profiles
//! - [`health`]: rolling success/latency window per provider
//! - [`routing`]: weighted scoring and the fallback order
//! - [`retry`]: backoff configuration and the bounded attempt helpers

pub mod health;
pub mod llm_analysis;
pub mod parse;
pub mod profile;
pub mod retry;
pub mod routing;
pub mod traits;

pub use health::{HealthMonitor, ProviderHealth};
pub use llm_analysis::{LlmAnalysisProvider, Pricing};
pub use profile::{AccuracyTier, ComplexityFit, ProviderProfile};
pub use retry::{Backoff, RetryConfig};
pub use routing::{ProviderRouter, ProviderScore, RoutingConfig};
pub use traits::{AnalysisProvider, ProviderResponse};
