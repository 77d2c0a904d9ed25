//! Caching subsystem.
//!
//! [`ResultCache`] holds successful analysis results keyed on a content hash
//! of the request. The orchestrator consults it before routing and writes
//! to it after a successful provider call. See [`result`] for expiry,
//! capacity, and purge semantics.
//!
//! The cost tracker keeps its own aggregate memo (see
//! [`CostTracker`](crate::CostTracker)); it is not part of this module.

pub mod result;

pub use result::{CacheConfig, CacheStats, ResultCache, cache_key, requester_pattern};
