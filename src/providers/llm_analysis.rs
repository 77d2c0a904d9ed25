//! LLM crate wrapper implementing [`AnalysisProvider`].
//!
//! [`LlmAnalysisProvider`] stores backend configuration and builds an `llm`
//! provider per request, because the system prompt is set at build time
//! and differs per task. Each call sends one user message carrying the
//! task input as JSON and parses the first JSON object of the reply.
//!
//! Cost is computed from token usage when per-1k-token pricing is
//! configured, otherwise the per-request estimate is used.

use async_trait::async_trait;
use llm::LLMProvider;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

use super::parse::{self, ParsedReply};
use super::traits::{AnalysisProvider, ProviderResponse};
use crate::types::{
    DiiScore, FoodAnalysis, FoodItem, HealthProfile, HealthRecord, HealthRiskAssessment,
    InflammationLevel, ProviderKind, RiskSignals, TaskType,
};
use crate::{NutrigateError, Result};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Per-call pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    /// Estimate used when token pricing is unknown.
    pub per_request_usd: f64,
    pub input_per_1k_usd: Option<f64>,
    pub output_per_1k_usd: Option<f64>,
}

impl Pricing {
    pub fn per_request(usd: f64) -> Self {
        Self {
            per_request_usd: usd,
            input_per_1k_usd: None,
            output_per_1k_usd: None,
        }
    }

    /// Cost of a call, given `(prompt_tokens, completion_tokens)` if reported.
    pub fn cost(&self, usage: Option<(u32, u32)>) -> f64 {
        match (usage, self.input_per_1k_usd, self.output_per_1k_usd) {
            (Some((prompt, completion)), Some(input), Some(output)) => {
                f64::from(prompt) / 1000.0 * input + f64::from(completion) / 1000.0 * output
            }
            _ => self.per_request_usd,
        }
    }
}

/// Adapter for one `llm` backend.
///
/// # Example
///
/// ```ignore
/// use nutrigate::ProviderKind;
/// use nutrigate::providers::LlmAnalysisProvider;
///
/// let gemini = LlmAnalysisProvider::new(ProviderKind::Gemini, Some("your-key"))
///     .model("gemini-2.0-flash");
/// ```
pub struct LlmAnalysisProvider {
    kind: ProviderKind,
    backend: LLMBackend,
    api_key: Option<String>,
    model: String,
    /// Override for the backend's API base URL.
    base_url: Option<String>,
    /// Models endpoint probed by `health_check`.
    health_url: String,
    timeout_secs: u64,
    max_tokens: u32,
    pricing: Pricing,
    /// Shared HTTP client for health probes.
    http_client: reqwest::Client,
}

impl LlmAnalysisProvider {
    /// Create an adapter with the provider's default backend, model, and
    /// pricing.
    pub fn new(kind: ProviderKind, api_key: Option<impl Into<String>>) -> Self {
        Self::with_http_client(kind, api_key, reqwest::Client::new())
    }

    /// Create an adapter with a shared HTTP client.
    pub fn with_http_client(
        kind: ProviderKind,
        api_key: Option<impl Into<String>>,
        http_client: reqwest::Client,
    ) -> Self {
        let (backend, model, health_url, per_request) = match kind {
            ProviderKind::OpenAi => (
                LLMBackend::OpenAI,
                "gpt-4o",
                "https://api.openai.com/v1/models",
                0.010,
            ),
            ProviderKind::Anthropic => (
                LLMBackend::Anthropic,
                "claude-sonnet-4-20250514",
                "https://api.anthropic.com/v1/models",
                0.015,
            ),
            ProviderKind::Gemini => (
                LLMBackend::Google,
                "gemini-2.0-flash",
                "https://generativelanguage.googleapis.com/v1beta/models",
                0.005,
            ),
        };
        Self {
            kind,
            backend,
            api_key: api_key.map(|k| k.into()),
            model: model.to_owned(),
            base_url: None,
            health_url: health_url.to_owned(),
            timeout_secs: 60,
            max_tokens: 1024,
            pricing: Pricing::per_request(per_request),
            http_client,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the models endpoint used by `health_check` (testing).
    pub fn health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = url.into();
        self
    }

    /// Set the transport timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Build an llm provider with the task's system prompt.
    fn build_provider(&self, task: TaskType) -> Result<Box<dyn LLMProvider>> {
        let mut builder = LLMBuilder::new()
            .backend(self.backend.clone())
            .model(&self.model)
            .timeout_seconds(self.timeout_secs)
            .max_tokens(self.max_tokens)
            .system(system_prompt(task));
        if let Some(ref key) = self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(ref url) = self.base_url {
            builder = builder.base_url(url.clone());
        }
        builder
            .build()
            .map_err(|e| NutrigateError::Llm(e.to_string()))
    }

    #[instrument(name = "llm.analyze", skip(self, input), fields(provider = %self.kind, task_type = %task))]
    async fn complete<I, T>(&self, task: TaskType, input: &I) -> Result<ProviderResponse<T>>
    where
        I: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Default + Send,
    {
        let provider = self.build_provider(task)?;
        let message = ChatMessage::user()
            .content(serde_json::to_string(input)?)
            .build();

        let response = provider
            .chat(&[message])
            .await
            .map_err(NutrigateError::from)?;

        let usage = response
            .usage()
            .map(|u| (u.prompt_tokens, u.completion_tokens));
        let cost_usd = self.pricing.cost(usage);
        let text = response.text().unwrap_or_default();
        debug!(reply_len = text.len(), cost_usd, "provider replied");

        let ParsedReply {
            data,
            confidence,
            parsed,
        } = parse::parse_reply::<T>(&text, self.kind, task);
        Ok(ProviderResponse {
            data,
            confidence,
            cost_usd,
            degraded: !parsed,
        })
    }
}

#[async_trait]
impl AnalysisProvider for LlmAnalysisProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn analyze_food(
        &self,
        text: &str,
        _requester_id: &str,
    ) -> Result<ProviderResponse<FoodAnalysis>> {
        self.complete(TaskType::FoodRecognition, &serde_json::json!({ "text": text }))
            .await
    }

    async fn calculate_dii(
        &self,
        food_items: &[FoodItem],
        _requester_id: &str,
    ) -> Result<ProviderResponse<DiiScore>> {
        let mut response: ProviderResponse<DiiScore> = self
            .complete(
                TaskType::DiiCalculation,
                &serde_json::json!({ "food_items": food_items }),
            )
            .await?;
        if response.data.level == InflammationLevel::Unknown {
            response.data.level = InflammationLevel::from_score(response.data.score);
        }
        Ok(response)
    }

    async fn assess_health_risk(
        &self,
        profile: &HealthProfile,
        _requester_id: &str,
    ) -> Result<ProviderResponse<HealthRiskAssessment>> {
        self.complete(TaskType::HealthAssessment, profile).await
    }

    async fn detect_risk_signals(
        &self,
        records: &[HealthRecord],
        _requester_id: &str,
    ) -> Result<ProviderResponse<RiskSignals>> {
        self.complete(
            TaskType::RiskDetection,
            &serde_json::json!({ "records": records }),
        )
        .await
    }

    #[instrument(name = "llm.health_check", skip(self), fields(provider = %self.kind))]
    async fn health_check(&self) -> bool {
        let mut request = self
            .http_client
            .get(&self.health_url)
            .timeout(HEALTH_CHECK_TIMEOUT);
        if let Some(ref key) = self.api_key {
            request = match self.kind {
                ProviderKind::OpenAi => request.bearer_auth(key),
                ProviderKind::Anthropic => request
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION),
                ProviderKind::Gemini => request.header("x-goog-api-key", key),
            };
        }
        match request.send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                debug!(status = response.status().as_u16(), healthy, "health probe");
                healthy
            }
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        }
    }
}

fn system_prompt(task: TaskType) -> &'static str {
    match task {
        TaskType::FoodRecognition => {
            "Identify the foods in the user's text. Reply with one JSON object: \
             {\"items\": [{\"name\", \"amount_g\", \"category\", \"calories_kcal\"}], \
             \"total_calories_kcal\", \"notes\", \"confidence\"}."
        }
        TaskType::DiiCalculation => {
            "Estimate the Dietary Inflammatory Index of the given food items. Reply with one \
             JSON object: {\"score\", \"level\": \"anti_inflammatory\"|\"neutral\"|\
             \"pro_inflammatory\", \"components\": [{\"parameter\", \"contribution\"}], \
             \"notes\", \"confidence\"}."
        }
        TaskType::HealthAssessment => {
            "Assess the health risk of the given profile. Reply with one JSON object: \
             {\"risk_level\": \"low\"|\"moderate\"|\"high\"|\"critical\", \"risk_score\" \
             (0-100), \"factors\": [], \"recommendations\": [], \"confidence\"}."
        }
        TaskType::RiskDetection => {
            "Detect risk signals in the given time series of health records. Reply with one \
             JSON object: {\"signals\": [{\"metric\", \"severity\", \"description\"}], \
             \"overall\", \"requires_attention\", \"confidence\"}."
        }
    }
}
