//! Chat provider capability
//!
//! A single operation, `chat(system, user, hint)`, with three variants:
//! Dummy (deterministic echo), OpenAI chat completions, and the
//! Anthropic messages API. Selection is config-driven; missing
//! credentials downgrade to Dummy with a warning.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bgcoach_config::{LlmConfig, LlmProvider};

/// Provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout after {0} ms")]
    Timeout(u64),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(0)
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// The chat capability.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// One round trip: system prompt, user message, and a side-channel
    /// hint listing detected error tags.
    async fn chat(&self, system: &str, user: &str, hint: &str) -> Result<String, ProviderError>;

    /// Provider name for logs and health reporting.
    fn name(&self) -> &'static str;
}

/// Deterministic local provider; the default and the credential-less
/// fallback.
pub struct DummyProvider;

#[async_trait]
impl ChatProvider for DummyProvider {
    async fn chat(&self, _system: &str, user: &str, _hint: &str) -> Result<String, ProviderError> {
        Ok(format!("Чух те: {user}"))
    }

    fn name(&self) -> &'static str {
        "dummy"
    }
}

/// OpenAI chat completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| ProviderError::Configuration("OPENAI_API_KEY not set".into()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: "gpt-4o-mini".to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: "https://api.openai.com".to_string(),
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    content: String,
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn chat(&self, system: &str, user: &str, hint: &str) -> Result<String, ProviderError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: with_hint(system, hint),
                },
                OpenAiMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("HTTP {status}: {body}")));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("empty choices".into()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Anthropic messages API client.
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    endpoint: String,
}

impl ClaudeClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .ok_or_else(|| ProviderError::Configuration("ANTHROPIC_API_KEY not set".into()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: "claude-3-5-haiku-20241022".to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: "https://api.anthropic.com".to_string(),
        })
    }
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[async_trait]
impl ChatProvider for ClaudeClient {
    async fn chat(&self, system: &str, user: &str, hint: &str) -> Result<String, ProviderError> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: with_hint(system, hint),
            messages: vec![ClaudeMessage {
                role: "user",
                content: user,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("HTTP {status}: {body}")));
        }

        let parsed: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ClaudeContentBlock::Text { text } => Some(text),
                ClaudeContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse("no text blocks".into()));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}

fn with_hint(system: &str, hint: &str) -> String {
    if hint.is_empty() {
        system.to_string()
    } else {
        format!("{system}\n\nDetected error tags: {hint}")
    }
}

/// Build the configured provider, downgrading to Dummy when the
/// credentials are absent.
pub fn build_provider(config: &LlmConfig) -> Box<dyn ChatProvider> {
    match config.provider {
        LlmProvider::Dummy => Box::new(DummyProvider),
        LlmProvider::Openai => match OpenAiClient::new(config) {
            Ok(client) => Box::new(client),
            Err(e) => {
                tracing::warn!(error = %e, "OpenAI provider unavailable, using dummy");
                Box::new(DummyProvider)
            }
        },
        LlmProvider::Claude => match ClaudeClient::new(config) {
            Ok(client) => Box::new(client),
            Err(e) => {
                tracing::warn!(error = %e, "Claude provider unavailable, using dummy");
                Box::new(DummyProvider)
            }
        },
    }
}

/// A per-call deadline wrapper used by the composer.
pub async fn chat_with_deadline(
    provider: &dyn ChatProvider,
    system: &str,
    user: &str,
    hint: &str,
    deadline: Duration,
) -> Result<String, ProviderError> {
    match tokio::time::timeout(deadline, provider.chat(system, user, hint)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline.as_millis() as u64)),
    }
}
