use super::{LlmError, LlmProvider, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn http_client() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Map a non-success HTTP status into an `LlmError`
async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited(format!(
            "{} API: {}",
            provider, error_text
        )));
    }

    Err(LlmError::Api {
        status: status.as_u16(),
        message: format!("{} API: {}", provider, error_text),
    })
}

fn request_error(provider: &str, err: reqwest::Error) -> LlmError {
    LlmError::Request(format!("{} API error: {}", provider, err))
}

fn parse_error(provider: &str, err: reqwest::Error) -> LlmError {
    LlmError::MalformedResponse(format!("{} response: {}", provider, err))
}

// ============================================
// Google Gemini Provider
// ============================================

pub struct GeminiProvider {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Gemini", e))?;

        let result: GeminiResponse = check_status("Gemini", response)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("Gemini", e))?;

        Ok(result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================
// Anthropic Claude Provider
// ============================================

pub struct AnthropicProvider {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Anthropic", e))?;

        let result: AnthropicResponse = check_status("Anthropic", response)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("Anthropic", e))?;

        Ok(result
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

// ============================================
// OpenAI Provider
// ============================================

pub struct OpenAIProvider {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct OpenAICompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = OpenAICompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature: 0.2,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("OpenAI", e))?;

        let result: OpenAICompletionResponse = check_status("OpenAI", response)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("OpenAI", e))?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
