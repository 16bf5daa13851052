// ============================================
// Scoring Collaborator
// ============================================
//
// Every stage that needs judgement (priority inference, threshold scores,
// comparative ranking, tie-breaker explanations) sends one prompt and reads
// one JSON object back. Providers are interchangeable behind `LlmProvider`;
// `ScoringCollaborator` adds pacing, the per-call deadline and JSON extraction.

pub mod providers;

pub use providers::{AnthropicProvider, GeminiProvider, OpenAIProvider};

use crate::config::LlmConfig;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use resilience::{with_timeout, TimeoutError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("scoring collaborator not configured")]
    NotConfigured,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("empty response from collaborator")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Rate-limit and quota failures are the only ones worth retrying
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LlmError::RateLimited(_) => true,
            LlmError::Api { status: 429, .. } => true,
            LlmError::Timeout(_) | LlmError::NotConfigured | LlmError::EmptyResponse => false,
            other => {
                let message = other.to_string().to_lowercase();
                ["429", "quota", "rate limit", "resource exhausted", "resource_exhausted"]
                    .iter()
                    .any(|marker| message.contains(marker))
            }
        }
    }
}

impl From<TimeoutError> for LlmError {
    fn from(err: TimeoutError) -> Self {
        LlmError::Timeout(err.0)
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Get provider name
    fn name(&self) -> &'static str;
}

/// Strip a leading ```` ```json ```` or ```` ``` ```` fence and a trailing
/// ```` ``` ```` fence from a collaborator response.
pub fn extract_json_payload(response: &str) -> &str {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

#[derive(Clone)]
pub struct ScoringCollaborator {
    provider: Arc<dyn LlmProvider>,
    max_tokens: u32,
    timeout: Duration,
    request_delay: Duration,
}

impl ScoringCollaborator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let defaults = LlmConfig::default();
        Self {
            provider,
            max_tokens: defaults.max_tokens,
            timeout: defaults.timeout(),
            request_delay: defaults.request_delay(),
        }
    }

    /// Build the configured provider. `None` when the collaborator is disabled
    /// or has no usable API key; every stage then takes its fallback path.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.enabled {
            info!("Scoring collaborator is disabled");
            return None;
        }

        if !config.has_credentials() {
            warn!(provider = %config.provider, "No API key configured for scoring collaborator");
            return None;
        }

        let provider: Arc<dyn LlmProvider> = match config.provider.to_lowercase().as_str() {
            "gemini" => Arc::new(GeminiProvider::new(&config.api_key, &config.model)),
            "anthropic" => Arc::new(AnthropicProvider::new(&config.api_key, &config.model)),
            "openai" => Arc::new(OpenAIProvider::new(&config.api_key, &config.model)),
            _ => {
                warn!(provider = %config.provider, "Unknown LLM provider, using Gemini");
                Arc::new(GeminiProvider::new(&config.api_key, &config.model))
            }
        };

        info!(
            provider = provider.name(),
            model = %config.model,
            "Scoring collaborator initialized"
        );

        Some(Self {
            provider,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
            request_delay: config.request_delay(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send one prompt and return the raw text response
    pub async fn score(&self, prompt: &str) -> Result<String> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        debug!(
            provider = self.provider.name(),
            prompt_chars = prompt.len(),
            "Sending prompt to scoring collaborator"
        );

        let text = with_timeout(
            self.timeout,
            self.provider.complete(prompt, self.max_tokens),
        )
        .await?;

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }

    /// Send one prompt and parse the response as a JSON value
    pub async fn score_json(&self, prompt: &str) -> Result<Value> {
        let text = self.score(prompt).await?;
        let payload = extract_json_payload(&text);

        serde_json::from_str(payload).map_err(|e| {
            warn!(
                error = %e,
                response = truncate_chars(payload, 200),
                "Failed to parse collaborator response"
            );
            LlmError::MalformedResponse(e.to_string())
        })
    }
}

/// Deterministic provider for unit tests of the stages
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

    pub struct ScriptedProvider {
        responder: Responder,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn new(responder: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                responder: Box::new(responder),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn replying(text: &str) -> Arc<Self> {
            let text = text.to_string();
            Self::new(move |_| Ok(text.clone()))
        }

        pub fn failing(error: LlmError) -> Arc<Self> {
            Self::new(move |_| Err(error.clone()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            (self.responder)(prompt)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    pub fn collaborator(provider: &Arc<ScriptedProvider>) -> ScoringCollaborator {
        ScoringCollaborator::new(provider.clone())
    }
}
