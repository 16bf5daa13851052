//! Configuration for talent-ranking-service, loaded from environment variables
use resilience::RetryConfig;
use serde::Deserialize;
use std::time::Duration;

/// API key values shipped in sample `.env` files; treated as unset
const PLACEHOLDER_API_KEYS: [&str; 2] = ["your_api_key_here", "your_gemini_api_key_here"];

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub llm: LlmConfig,
    pub ranking: RankingConfig,
    pub tie_breaker: TieBreakerConfig,
    pub pool: PoolConfig,
}

impl Config {
    /// Load every section from its prefixed environment variables
    /// (`LLM_*`, `RANKING_*`, `TIE_BREAKER_*`, `POOL_*`).
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        Ok(Config {
            llm: envy::prefixed("LLM_").from_env()?,
            ranking: envy::prefixed("RANKING_").from_env()?,
            tie_breaker: envy::prefixed("TIE_BREAKER_").from_env()?,
            pool: envy::prefixed("POOL_").from_env()?,
        })
    }
}

/// Scoring collaborator settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,

    /// gemini | anthropic | openai
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause before each request, to stay under provider rate limits
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl LlmConfig {
    /// True when an API key other than the sample placeholder is present
    pub fn has_credentials(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !PLACEHOLDER_API_KEYS.contains(&key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            provider: default_llm_provider(),
            api_key: String::new(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: 0,
        }
    }
}

fn default_llm_enabled() -> bool {
    true
}

fn default_llm_provider() -> String {
    "gemini".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    60
}

/// Comparative ranking settings
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Candidates per collaborator call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Total attempts per batch, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

impl RankingConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_retry_delay_ms),
            max_backoff: Duration::from_millis(self.max_retry_delay_ms),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            max_attempts: default_max_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    20
}

fn default_max_concurrent_batches() -> usize {
    2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    2000
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct TieBreakerConfig {
    /// Largest adjacent match-score gap still treated as a tie (inclusive)
    #[serde(default = "default_tie_threshold")]
    pub threshold: f64,

    /// Ask the collaborator for a pair-specific explanation of each close pair
    #[serde(default)]
    pub detailed_explanations: bool,
}

impl Default for TieBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_tie_threshold(),
            detailed_explanations: false,
        }
    }
}

fn default_tie_threshold() -> f64 {
    5.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Candidates rendered in full before the rest are summarized
    #[serde(default = "default_max_detailed")]
    pub max_detailed: usize,

    /// Shorter job descriptions skip priority inference
    #[serde(default = "default_min_job_description_chars")]
    pub min_job_description_chars: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_detailed: default_max_detailed(),
            min_job_description_chars: default_min_job_description_chars(),
        }
    }
}

fn default_max_detailed() -> usize {
    50
}

fn default_min_job_description_chars() -> usize {
    50
}
