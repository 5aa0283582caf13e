use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Verdict, VerificationSummary};

/// Everything one pipeline run produced for a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub run_id: Uuid,
    pub checked_at: DateTime<Utc>,
    pub verdicts: Vec<Verdict>,
    pub summary: VerificationSummary,
}

impl VerificationReport {
    pub fn new(run_id: Uuid, verdicts: Vec<Verdict>) -> Self {
        let summary = VerificationSummary::from_verdicts(&verdicts);
        Self {
            run_id,
            checked_at: Utc::now(),
            verdicts,
            summary,
        }
    }
}

/// Result of `VerificationPipeline::run`.
///
/// `NoClaims` is a normal outcome ("no verifiable claims found"), not a failure.
/// When extraction itself failed the cause is carried along for display.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    NoClaims {
        run_id: Uuid,
        extraction_error: Option<String>,
    },
    Verified(VerificationReport),
}

impl RunOutcome {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunOutcome::NoClaims { run_id, .. } => *run_id,
            RunOutcome::Verified(report) => report.run_id,
        }
    }

    pub fn verdicts(&self) -> &[Verdict] {
        match self {
            RunOutcome::NoClaims { .. } => &[],
            RunOutcome::Verified(report) => &report.verdicts,
        }
    }

    pub fn summary(&self) -> VerificationSummary {
        match self {
            RunOutcome::NoClaims { .. } => VerificationSummary::default(),
            RunOutcome::Verified(report) => report.summary,
        }
    }

    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            RunOutcome::NoClaims { .. } => None,
            RunOutcome::Verified(report) => Some(report),
        }
    }

    pub fn is_no_claims(&self) -> bool {
        matches!(self, RunOutcome::NoClaims { .. })
    }
}
