//! Request orchestration.
//!
//! For every analysis request the [`Orchestrator`]:
//!
//! 1. computes the cache key and returns a fresh cached result if present
//!    (risk detection is never cached),
//! 2. picks a primary provider: DII and health assessments go directly to
//!    the reasoning provider, everything else is scored by the router with
//!    the remaining daily budget as one input,
//! 3. retries the primary with increasing backoff, then tries each provider
//!    in the fallback chain once, every attempt bounded by the provider's
//!    timeout,
//! 4. on success caches the result with the task's TTL and records its cost.
//!
//! If every provider fails the caller gets one
//! [`AllProvidersFailed`](crate::NutrigateError::AllProvidersFailed) error
//! and nothing is cached or charged.

mod builder;
mod service;

pub use builder::OrchestratorBuilder;
pub use service::Orchestrator;
