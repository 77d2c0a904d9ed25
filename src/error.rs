//! Nutrigate error types

use std::time::Duration;

use crate::types::ProviderKind;

/// Nutrigate error types
#[derive(Debug, thiserror::Error)]
pub enum NutrigateError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("provider not registered: {0}")]
    ProviderNotRegistered(ProviderKind),

    #[error("configuration error: {0}")]
    Configuration(String),

    // Execution outcomes
    #[error("analysis cancelled")]
    Cancelled,

    /// Every provider in the retry + fallback chain failed.
    ///
    /// Callers only ever see this single error; individual attempt failures
    /// are logged, not surfaced.
    #[error("all providers failed after {attempts} attempts: {last}")]
    AllProvidersFailed {
        attempts: u32,
        last: Box<NutrigateError>,
    },

    // Wrapped llm crate error
    #[error("LLM error: {0}")]
    Llm(String),
}

impl NutrigateError {
    /// Whether the error is likely to go away on retry.
    ///
    /// Network failures, timeouts, rate limits, and 5xx / 408 responses are
    /// transient. The orchestrator retries every error except
    /// [`Cancelled`](Self::Cancelled) regardless; this classification is
    /// reported in logs and metrics.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<llm::error::LLMError> for NutrigateError {
    fn from(err: llm::error::LLMError) -> Self {
        // Map llm errors to our error types
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("rate limit") || lower.contains("429") {
            NutrigateError::RateLimited { retry_after: None }
        } else if lower.contains("authentication")
            || lower.contains("401")
            || lower.contains("invalid api key")
        {
            NutrigateError::AuthenticationFailed
        } else if lower.contains("timed out") || lower.contains("timeout") {
            NutrigateError::Http(msg)
        } else {
            NutrigateError::Llm(msg)
        }
    }
}

/// Result type alias for Nutrigate operations
pub type Result<T> = std::result::Result<T, NutrigateError>;
