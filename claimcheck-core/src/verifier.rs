//! Per-claim verification: retrieve evidence, classify, and always produce a verdict.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::llm::{CompletionRequest, LlmError, TextGenerator};
use crate::models::{Claim, EvidenceItem, Verdict};
use crate::payload::{decode_classification, PayloadError};
use crate::search::{EvidenceRetriever, SearchError, DEFAULT_MAX_RESULTS};

pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are a fact checker. Return only valid JSON.";

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("evidence search failed: {0}")]
    Search(#[from] SearchError),

    #[error("classification request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("malformed classification: {0}")]
    Payload(#[from] PayloadError),

    #[error("no result within {0:?}")]
    Timeout(Duration),
}

/// Join evidence as `Source: <url>\n<snippet>` blocks separated by blank lines.
pub fn build_context(evidence: &[EvidenceItem]) -> String {
    evidence
        .iter()
        .map(|e| format!("Source: {}\n{}", e.source, e.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn classification_prompt(claim: &Claim, context: &str) -> String {
    format!(
        "Given this claim and web search results, determine if the claim is:\n\
- \"Verified\" (accurate based on current data)\n\
- \"Inaccurate\" (outdated or slightly wrong)\n\
- \"False\" (contradicts evidence or no support found)\n\
\n\
Claim: {}\n\
\n\
Search Results:\n\
{}\n\
\n\
Return ONLY a JSON object, no markdown, no explanations:\n\
{{\n\
    \"status\": \"Verified/Inaccurate/False\",\n\
    \"explanation\": \"brief explanation with specific facts\",\n\
    \"sources\": [\"url1\", \"url2\"]\n\
}}",
        claim, context
    )
}

pub struct ClaimVerifier {
    retriever: Arc<dyn EvidenceRetriever>,
    generator: Arc<dyn TextGenerator>,
    max_results: usize,
    timeout: Duration,
    temperature: f32,
}

impl ClaimVerifier {
    pub fn new(retriever: Arc<dyn EvidenceRetriever>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            retriever,
            generator,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: DEFAULT_VERIFICATION_TIMEOUT,
            temperature: crate::llm::DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Upper bound on search plus classification for one claim.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Verify one claim, surfacing failures as a typed error.
    pub async fn try_verify(&self, claim: &Claim) -> Result<Verdict, VerificationError> {
        tokio::time::timeout(self.timeout, self.classify(claim))
            .await
            .map_err(|_| VerificationError::Timeout(self.timeout))?
    }

    async fn classify(&self, claim: &Claim) -> Result<Verdict, VerificationError> {
        let evidence = self.retriever.search(claim.as_str(), self.max_results).await?;
        tracing::debug!(
            backend = self.retriever.name(),
            results = evidence.len(),
            "Retrieved evidence"
        );

        let context = build_context(&evidence);
        let request = CompletionRequest::new(SYSTEM_PROMPT, classification_prompt(claim, &context))
            .with_temperature(self.temperature);
        let raw = self.generator.complete(&request).await?;
        let classification = decode_classification(&raw)?;

        // The model's echo of the claim is ignored; the extracted text is authoritative.
        Ok(Verdict {
            claim: claim.clone(),
            status: classification.status,
            explanation: classification.explanation,
            sources: classification.sources,
        })
    }

    /// Verify one claim. Never fails: any error becomes an `Error` verdict.
    pub async fn verify(&self, claim: &Claim) -> Verdict {
        match self.try_verify(claim).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(claim = %claim, error = %e, "Claim could not be verified");
                Verdict::error(claim.clone(), e)
            }
        }
    }
}
