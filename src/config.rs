//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.nutrigate/config.toml` (user)
//! 3. `/etc/nutrigate/config.toml` (system)
//!
//! A missing file yields the defaults. `NUTRIGATE_DAILY_LIMIT_USD` and
//! `NUTRIGATE_MONTHLY_LIMIT_USD` override the budget section.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.nutrigate/secrets.toml` (user, must be 0600)
//! 2. `/etc/nutrigate/secrets.toml` (system, must be 0600)
//!
//! and fall back to `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::CacheConfig;
use crate::cost::CostLimits;
use crate::orchestrator::OrchestratorBuilder;
use crate::providers::{
    Backoff, LlmAnalysisProvider, Pricing, ProviderProfile, RetryConfig, RoutingConfig,
};
use crate::types::ProviderKind;
use crate::{NutrigateError, Result};

const DAILY_LIMIT_ENV: &str = "NUTRIGATE_DAILY_LIMIT_USD";
const MONTHLY_LIMIT_ENV: &str = "NUTRIGATE_MONTHLY_LIMIT_USD";

/// Orchestrator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub budget: CostLimits,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Provider configurations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: Option<ProviderSettings>,
    #[serde(default)]
    pub anthropic: Option<ProviderSettings>,
    #[serde(default)]
    pub gemini: Option<ProviderSettings>,
}

impl ProvidersConfig {
    pub fn get(&self, provider: ProviderKind) -> Option<&ProviderSettings> {
        match provider {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }
}

/// Per-provider overrides. Unset fields keep the provider's defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Set to false to leave the provider unregistered even with a key.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub health_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub cost_per_request_usd: Option<f64>,
    #[serde(default)]
    pub input_cost_per_1k: Option<f64>,
    #[serde(default)]
    pub output_cost_per_1k: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub cleanup_interval_secs: u64,
    pub food_ttl_secs: u64,
    pub dii_ttl_secs: u64,
    pub health_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_entries: defaults.max_entries,
            cleanup_interval_secs: defaults.cleanup_interval.as_secs(),
            food_ttl_secs: defaults.food_ttl.as_secs(),
            dii_ttl_secs: defaults.dii_ttl.as_secs(),
            health_ttl_secs: defaults.health_ttl.as_secs(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(s: &CacheSettings) -> Self {
        CacheConfig::new()
            .max_entries(s.max_entries)
            .cleanup_interval(Duration::from_secs(s.cleanup_interval_secs))
            .food_ttl(Duration::from_secs(s.food_ttl_secs))
            .dii_ttl(Duration::from_secs(s.dii_ttl_secs))
            .health_ttl(Duration::from_secs(s.health_ttl_secs))
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            backoff: defaults.backoff,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        RetryConfig::new()
            .max_attempts(s.max_attempts)
            .initial_delay(Duration::from_millis(s.initial_delay_ms))
            .max_delay(Duration::from_millis(s.max_delay_ms))
            .backoff(s.backoff)
    }
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openai: Option<ApiKeySecret>,
    #[serde(default)]
    pub anthropic: Option<ApiKeySecret>,
    #[serde(default)]
    pub gemini: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

fn provider_env_var(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::Gemini => "GEMINI_API_KEY",
    }
}

impl Config {
    /// Load configuration from the standard locations and apply
    /// environment overrides.
    ///
    /// An explicit path that does not exist is an error; otherwise a missing
    /// file yields the defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a config file without applying environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            NutrigateError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            NutrigateError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(NutrigateError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".nutrigate").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/nutrigate/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Apply budget overrides from `lookup` (the environment, in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(DAILY_LIMIT_ENV) {
            self.budget.daily_limit_usd = parse_limit(DAILY_LIMIT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MONTHLY_LIMIT_ENV) {
            self.budget.monthly_limit_usd = parse_limit(MONTHLY_LIMIT_ENV, &raw)?;
        }
        Ok(())
    }

    /// Build an orchestrator builder from this config.
    ///
    /// Providers without an API key are skipped, as are providers with
    /// `enabled = false`.
    pub fn builder(&self, secrets: &Secrets) -> OrchestratorBuilder {
        let http_client = reqwest::Client::new();
        let mut builder = OrchestratorBuilder::new()
            .http_client(http_client.clone())
            .retry(RetryConfig::from(&self.retry))
            .routing(self.routing.clone())
            .cache(CacheConfig::from(&self.cache))
            .cost_limits(self.budget);

        for kind in ProviderKind::ALL {
            let settings = self.providers.get(kind);
            if settings.is_some_and(|s| !s.enabled) {
                debug!(provider = kind.as_str(), "provider disabled in config");
                continue;
            }
            let Some(api_key) = secrets.api_key(kind) else {
                debug!(provider = kind.as_str(), "no API key, provider not registered");
                continue;
            };

            let mut profile = ProviderProfile::default_for(kind);
            let mut adapter =
                LlmAnalysisProvider::with_http_client(kind, Some(api_key), http_client.clone());
            if let Some(s) = settings {
                if let Some(secs) = s.timeout_secs {
                    profile = profile.timeout(Duration::from_secs(secs));
                }
                if let Some(cost) = s.cost_per_request_usd {
                    profile = profile.cost_per_call(cost);
                }
                if let Some(ref model) = s.model {
                    adapter = adapter.model(model);
                }
                if let Some(ref url) = s.base_url {
                    adapter = adapter.base_url(url);
                }
                if let Some(ref url) = s.health_url {
                    adapter = adapter.health_url(url);
                }
                if let Some(max) = s.max_tokens {
                    adapter = adapter.max_tokens(max);
                }
                adapter = adapter.pricing(Pricing {
                    per_request_usd: profile.cost_per_call_usd,
                    input_per_1k_usd: s.input_cost_per_1k,
                    output_per_1k_usd: s.output_cost_per_1k,
                });
            }
            adapter = adapter.timeout_secs(profile.timeout.as_secs());
            builder = builder.provider_with_profile(Arc::new(adapter), profile);
        }
        builder
    }
}

fn parse_limit(name: &str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(NutrigateError::Configuration(format!(
            "{name} must be a non-negative number, got {raw:?}"
        ))),
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.nutrigate/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/nutrigate/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (providers may use env vars).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".nutrigate").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = PathBuf::from("/etc/nutrigate/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        // No secrets file: empty, providers fall back to env vars
        Ok(Secrets::default())
    }

    /// Load one secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            NutrigateError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            NutrigateError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            NutrigateError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(NutrigateError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for a provider, falling back to its environment variable.
    pub fn api_key(&self, provider: ProviderKind) -> Option<String> {
        self.api_key_with(provider, |name| std::env::var(name).ok())
    }

    /// API key for a provider, falling back to `lookup`.
    pub fn api_key_with(
        &self,
        provider: ProviderKind,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let from_file = match provider {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
        .map(|s| s.api_key.clone());

        from_file
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(provider_env_var(provider)).filter(|k| !k.trim().is_empty()))
    }
}
