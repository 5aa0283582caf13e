//! Text-generation client for claimcheck
//!
//! Provides a `TextGenerator` trait with one implementation:
//! - **OpenAI chat completions**: `POST {base_url}/chat/completions`
//!
//! Both the extractor and the verifier talk to the same shared client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

/// Default sampling temperature for both extraction and classification.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// TextGenerator trait
// ============================================================================

/// One system + user prompt exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Abstraction over text-generation providers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one completion and return the raw text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Completion response had no content")]
    MissingContent,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} attempts failed: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl LlmError {
    /// Transport failures, rate limits and server errors may succeed on a
    /// later attempt. Everything else fails the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => !e.is_decode() && !e.is_builder(),
            LlmError::Api { code, .. } => *code == 429 || *code >= 500,
            LlmError::MissingContent
            | LlmError::MissingApiKey
            | LlmError::RetryExhausted { .. } => false,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// OpenAI wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiChatClient
// ============================================================================

/// Chat-completions client. Construct once and share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiChatClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, config })
    }

    /// Point the client at a different API root (for testing / compatible gateways).
    pub fn with_base_url(mut config: LlmConfig, base_url: String) -> Result<Self, LlmError> {
        config.base_url = base_url;
        Self::new(config)
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::MissingContent)
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let attempts = AtomicUsize::new(0);
        let result = RetryIf::start(
            retry_strategy,
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.complete_once(request)
            },
            LlmError::is_transient,
        )
        .await;

        result.map_err(|e| {
            if !e.is_transient() {
                return e;
            }
            let attempts = attempts.load(Ordering::Relaxed);
            tracing::error!(attempts, error = %e, "All completion attempts failed");
            LlmError::RetryExhausted {
                attempts,
                last: e.to_string(),
            }
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// TESTS
// ============================================================================
