//! Evidence retrieval over a web search backend.
//!
//! `TavilySearchClient` issues exactly one request per call. Retrying a failed
//! search is left to callers; the verifier turns failures into `Error` verdicts.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::EvidenceItem;

/// Results requested per claim unless configured otherwise.
pub const DEFAULT_MAX_RESULTS: usize = 3;

pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Abstraction over web search providers.
#[async_trait]
pub trait EvidenceRetriever: Send + Sync {
    /// Search for `query`, returning at most `max_results` items in backend
    /// rank order. An empty list means "no matches" and is not an error.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<EvidenceItem>, SearchError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl SearchConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: TAVILY_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyErrorResponse {
    detail: Option<TavilyErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct TavilyErrorDetail {
    error: String,
}

/// Tavily search client. Construct once and share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TavilySearchClient {
    client: Client,
    config: SearchConfig,
}

impl TavilySearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn with_base_url(mut config: SearchConfig, base_url: String) -> Result<Self, SearchError> {
        config.base_url = base_url;
        Self::new(config)
    }
}

#[async_trait]
impl EvidenceRetriever for TavilySearchClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<EvidenceItem>, SearchError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&TavilyRequest { query, max_results })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TavilyErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.detail)
                .map(|d| d.error)
                .unwrap_or(error_body);

            tracing::warn!(code = status.as_u16(), message = %message, "Search API error");

            return Err(SearchError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: TavilyResponse = response.json().await?;

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(|r| EvidenceItem::new(r.url, r.content))
            .collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
