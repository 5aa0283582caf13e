//! Verification orchestrator: extract once, verify every claim, summarise.

use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{ClaimcheckConfig, Credentials};
use crate::error::ClaimcheckError;
use crate::extractor::ClaimExtractor;
use crate::llm::{OpenAiChatClient, TextGenerator};
use crate::models::{RunOutcome, VerificationReport};
use crate::progress::ProgressSink;
use crate::search::{EvidenceRetriever, TavilySearchClient};
use crate::verifier::ClaimVerifier;

pub struct VerificationPipeline {
    extractor: ClaimExtractor,
    verifier: ClaimVerifier,
    concurrency: usize,
}

impl VerificationPipeline {
    pub fn new(extractor: ClaimExtractor, verifier: ClaimVerifier) -> Self {
        Self {
            extractor,
            verifier,
            concurrency: 1,
        }
    }

    /// Verify up to `concurrency` claims at once. Values below 1 mean 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Wire the pipeline from config around already-constructed clients.
    pub fn from_clients(
        config: &ClaimcheckConfig,
        generator: Arc<dyn TextGenerator>,
        retriever: Arc<dyn EvidenceRetriever>,
    ) -> Self {
        let extractor = ClaimExtractor::new(generator.clone())
            .with_max_chars(config.extraction.max_chars)
            .with_timeout(config.timeouts.extraction())
            .with_temperature(config.llm.temperature);

        let verifier = ClaimVerifier::new(retriever, generator)
            .with_max_results(config.search.max_results)
            .with_timeout(config.timeouts.verification())
            .with_temperature(config.llm.temperature);

        Self::new(extractor, verifier).with_concurrency(config.verification.concurrency)
    }

    /// Build one OpenAI client and one Tavily client and wire them in.
    pub fn connect(
        config: &ClaimcheckConfig,
        credentials: &Credentials,
    ) -> Result<Self, ClaimcheckError> {
        let generator: Arc<dyn TextGenerator> =
            Arc::new(OpenAiChatClient::new(config.llm_config(credentials))?);
        let retriever: Arc<dyn EvidenceRetriever> =
            Arc::new(TavilySearchClient::new(config.search_config(credentials))?);
        Ok(Self::from_clients(config, generator, retriever))
    }

    /// Run the full pipeline over `text`.
    ///
    /// Yields exactly one verdict per extracted claim, in extraction order,
    /// regardless of the concurrency setting.
    pub async fn run(&self, text: &str, sink: &dyn ProgressSink) -> RunOutcome {
        let run_id = Uuid::new_v4();
        tracing::info!(run_id = %run_id, chars = text.chars().count(), "Starting verification run");

        let extraction = self.extractor.extract(text).await;
        let extraction_error = extraction.error.map(|e| e.to_string());
        if let Some(message) = &extraction_error {
            sink.on_extraction_error(message);
        }

        let claims = extraction.claims;
        sink.on_claims_extracted(claims.len());

        if claims.is_empty() {
            tracing::info!(run_id = %run_id, "No verifiable claims found");
            return RunOutcome::NoClaims {
                run_id,
                extraction_error,
            };
        }

        let total = claims.len();
        let mut verdicts = Vec::with_capacity(total);

        // Collected first; a borrowing `.map` closure on the stream makes `run` non-Send.
        let pending: Vec<_> = claims
            .iter()
            .map(|claim| self.verifier.verify(claim))
            .collect();
        let stream = futures::stream::iter(pending).buffered(self.concurrency);
        let mut stream = std::pin::pin!(stream);

        while let Some(verdict) = stream.next().await {
            sink.on_verdict(&verdict);
            verdicts.push(verdict);
            sink.on_progress(verdicts.len(), total);
        }

        let report = VerificationReport::new(run_id, verdicts);
        tracing::info!(
            run_id = %run_id,
            total = report.summary.total,
            errors = report.summary.error_count,
            "Verification run finished"
        );
        sink.on_complete(&report.verdicts, &report.summary);
        RunOutcome::Verified(report)
    }
}
