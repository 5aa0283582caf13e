//! Claim extraction: document text in, ordered list of checkable claims out.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::llm::{CompletionRequest, LlmError, TextGenerator};
use crate::models::Claim;
use crate::payload::{decode_claims, PayloadError};

/// Characters of document text sent upstream; anything past this is ignored.
pub const DEFAULT_MAX_CHARS: usize = 8000;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are a precise claim extractor. Return only valid JSON.";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("completion request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("malformed claim list: {0}")]
    Payload(#[from] PayloadError),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Fail-soft extraction result. `error` is set when the upstream call or the
/// decode failed, in which case `claims` is empty.
#[derive(Debug, Default)]
pub struct Extraction {
    pub claims: Vec<Claim>,
    pub error: Option<ExtractionError>,
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn extraction_prompt(document: &str) -> String {
    format!(
        "Analyze this document and extract ONLY specific, verifiable factual claims.\n\
Focus on:\n\
- Statistics and percentages\n\
- Dates and timelines\n\
- Financial figures (prices, revenues, market caps, GDP)\n\
- Technical specifications\n\
- Quantifiable statements\n\
\n\
Return ONLY a JSON array of claims, nothing else. No markdown, no explanations.\n\
Format: [{{\"claim\": \"specific claim here\"}}, ...]\n\
\n\
Document:\n\
{}",
        document
    )
}

pub struct ClaimExtractor {
    generator: Arc<dyn TextGenerator>,
    max_chars: usize,
    timeout: Duration,
    temperature: f32,
}

impl ClaimExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_chars: DEFAULT_MAX_CHARS,
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
            temperature: crate::llm::DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Extract claims, surfacing failures as a typed error.
    pub async fn try_extract(&self, text: &str) -> Result<Vec<Claim>, ExtractionError> {
        let document = truncate_chars(text, self.max_chars);
        if document.trim().is_empty() {
            return Ok(Vec::new());
        }
        if document.len() < text.len() {
            tracing::debug!(
                max_chars = self.max_chars,
                "Document truncated before claim extraction"
            );
        }

        let request = CompletionRequest::new(SYSTEM_PROMPT, extraction_prompt(document))
            .with_temperature(self.temperature);

        let raw = tokio::time::timeout(self.timeout, self.generator.complete(&request))
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))??;

        Ok(decode_claims(&raw)?)
    }

    /// Extract claims without ever failing: errors are logged and returned
    /// alongside an empty claim list so one bad response cannot abort a run.
    pub async fn extract(&self, text: &str) -> Extraction {
        match self.try_extract(text).await {
            Ok(claims) => {
                tracing::info!(
                    count = claims.len(),
                    model = self.generator.model(),
                    "Extracted claims"
                );
                Extraction {
                    claims,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error extracting claims");
                Extraction {
                    claims: Vec::new(),
                    error: Some(e),
                }
            }
        }
    }
}
