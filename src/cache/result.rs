//! In-memory result cache with per-entry TTL and bounded size.
//!
//! [`ResultCache`] stores [`AnalysisResult`]s keyed on a content hash of the
//! request (see [`cache_key`]). It is advisory only: a miss or an eviction
//! changes cost and latency, never the result itself.
//!
//! # Expiry
//!
//! Entries carry their own TTL. Expired entries are removed lazily by
//! [`get`](ResultCache::get) and proactively by [`cleanup`](ResultCache::cleanup),
//! which [`spawn_cleanup`](ResultCache::spawn_cleanup) runs on a fixed interval
//! so that keys which are never read again do not accumulate.
//!
//! # Capacity
//!
//! When a new key would push the cache past `max_entries`, the entry with the
//! oldest creation time is evicted first, inside the same critical section
//! as the insert. Other callers never observe the cache over capacity.
//!
//! # Requester purge
//!
//! Identity-scoped keys embed the requester id in clear text
//! (`{task}:{requester}:{hash}`), so [`delete_pattern`](ResultCache::delete_pattern)
//! with [`requester_pattern`] removes everything cached for one customer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::telemetry;
use crate::types::{AnalysisPayload, AnalysisRequest, AnalysisResult, TaskType};
use crate::{NutrigateError, Result};

/// Configuration for the result cache.
///
/// ```rust
/// # use nutrigate::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .health_ttl(Duration::from_secs(15 * 60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: usize,
    /// Interval between background sweeps. Default: 5 minutes.
    pub cleanup_interval: Duration,
    /// TTL for food recognition results. Default: 1 hour.
    pub food_ttl: Duration,
    /// TTL for DII calculations. Default: 2 hours.
    pub dii_ttl: Duration,
    /// TTL for health-risk assessments. Default: 30 minutes.
    pub health_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            cleanup_interval: Duration::from_secs(5 * 60),
            food_ttl: Duration::from_secs(3600),
            dii_ttl: Duration::from_secs(2 * 3600),
            health_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the background sweep interval.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn food_ttl(mut self, ttl: Duration) -> Self {
        self.food_ttl = ttl;
        self
    }

    pub fn dii_ttl(mut self, ttl: Duration) -> Self {
        self.dii_ttl = ttl;
        self
    }

    pub fn health_ttl(mut self, ttl: Duration) -> Self {
        self.health_ttl = ttl;
        self
    }

    /// TTL for a task, or `None` if the task must never be cached.
    ///
    /// Risk-signal detection always reflects the latest records and is
    /// never cached.
    pub fn ttl_for(&self, task: TaskType) -> Option<Duration> {
        match task {
            TaskType::FoodRecognition => Some(self.food_ttl),
            TaskType::DiiCalculation => Some(self.dii_ttl),
            TaskType::HealthAssessment => Some(self.health_ttl),
            TaskType::RiskDetection => None,
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// `hits / (hits + misses)`, or 0 when nothing has been looked up.
    pub hit_rate: f64,
}

#[derive(Debug)]
struct CacheEntry {
    value: AnalysisResult,
    created_at: Instant,
    ttl: Duration,
    /// Insertion sequence, breaks ties between equal `created_at` values.
    seq: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.created_at.checked_add(self.ttl) {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// Thread-safe TTL + capacity-bounded store of analysis results.
pub struct ResultCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    /// Create an empty cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_max_entries(config.max_entries)
    }

    /// Create an empty cache holding at most `max_entries` results.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still usable.
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a fresh result.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let now = Instant::now();
        let mut state = self.state();
        let fresh = state.entries.get(key).map(|entry| entry.is_fresh(now));
        match fresh {
            Some(true) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                state.entries.get(key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                state.entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert (or overwrite) a result with its own TTL.
    ///
    /// Inserting a new key into a full cache first evicts the entry with the
    /// oldest creation time. Overwriting an existing key never evicts.
    pub fn set(&self, key: impl Into<String>, value: AnalysisResult, ttl: Duration) {
        if self.max_entries == 0 {
            return;
        }
        let key = key.into();
        let mut state = self.state();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
                debug!(key = %oldest, "evicted oldest cache entry");
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
                seq,
            },
        );
    }

    /// Remove one entry. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.state().entries.remove(key).is_some()
    }

    /// Remove every entry whose key matches `pattern`.
    ///
    /// Returns the number of entries removed, or `InvalidInput` if the
    /// pattern is not a valid regular expression.
    pub fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let re = Regex::new(pattern)
            .map_err(|e| NutrigateError::InvalidInput(format!("invalid cache pattern: {e}")))?;
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|key, _| !re.is_match(key));
        Ok(before - state.entries.len())
    }

    /// Remove all expired entries. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh(now));
        before - state.entries.len()
    }

    /// Run [`cleanup`](Self::cleanup) every `interval` on a background task.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped. Requires a tokio runtime.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.cleanup();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "swept expired cache entries");
                }
            }
        })
    }

    /// Evict all entries. Counters are kept.
    pub fn clear(&self) {
        self.state().entries.clear();
    }

    /// Number of entries currently stored, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            size: self.len(),
            capacity: self.max_entries,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

/// Compute the cache key for a request.
///
/// The hash is SHA-256 over the task type and the canonical JSON of the
/// normalized payload, truncated to 128 bits. Identity-scoped tasks put the
/// requester id in the key prefix; content-only tasks share entries across
/// requesters.
pub fn cache_key(request: &AnalysisRequest) -> Result<String> {
    let task = request.task_type();
    let normalized = normalize_payload(&request.payload);
    let canonical = serde_json::to_vec(&normalized)?;

    let mut hasher = Sha256::new();
    hasher.update(task.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(&canonical);
    if task.is_identity_scoped() {
        hasher.update([0u8]);
        hasher.update(request.requester_id.as_bytes());
    }
    let digest = hasher.finalize();
    let hash = hex::encode(&digest[..16]);

    Ok(if task.is_identity_scoped() {
        format!("{}:{}:{hash}", task.as_str(), request.requester_id)
    } else {
        format!("{}:{hash}", task.as_str())
    })
}

/// Regex matching every identity-scoped key belonging to `requester_id`.
pub fn requester_pattern(requester_id: &str) -> String {
    format!("^[a-z_]+:{}:[0-9a-f]+$", regex::escape(requester_id))
}

/// Canonicalise free text so trivially different inputs share an entry.
fn normalize_payload(payload: &AnalysisPayload) -> AnalysisPayload {
    match payload {
        AnalysisPayload::FoodRecognition { text } => AnalysisPayload::FoodRecognition {
            text: normalize_text(text),
        },
        other => other.clone(),
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
