//! Observation hooks for a pipeline run.
//!
//! A sink only watches: nothing it does can change which claims are checked
//! or what verdicts are produced.

use crate::models::{Verdict, VerificationSummary};

pub trait ProgressSink: Send + Sync {
    /// Extraction finished with `count` claims.
    fn on_claims_extracted(&self, _count: usize) {}

    /// Extraction failed; the run continues as if no claims were found.
    fn on_extraction_error(&self, _message: &str) {}

    /// Claim number `index` (1-based) of `total` has a verdict.
    fn on_progress(&self, _index: usize, _total: usize) {}

    fn on_verdict(&self, _verdict: &Verdict) {}

    /// All claims are done.
    fn on_complete(&self, _verdicts: &[Verdict], _summary: &VerificationSummary) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_claims_extracted(&self, count: usize) {
        tracing::info!(count, "Found claims to verify");
    }

    fn on_extraction_error(&self, message: &str) {
        tracing::warn!(error = %message, "Claim extraction failed");
    }

    fn on_progress(&self, index: usize, total: usize) {
        tracing::info!(index, total, "Verified claim {}/{}", index, total);
    }

    fn on_verdict(&self, verdict: &Verdict) {
        tracing::debug!(status = %verdict.status, claim = %verdict.claim, "Verdict");
    }

    fn on_complete(&self, _verdicts: &[Verdict], summary: &VerificationSummary) {
        tracing::info!(
            verified = summary.verified_count,
            inaccurate = summary.inaccurate_count,
            false_claims = summary.false_count,
            errors = summary.error_count,
            total = summary.total,
            "Verification complete"
        );
    }
}
