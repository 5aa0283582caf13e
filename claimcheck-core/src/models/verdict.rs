use serde::{Deserialize, Serialize};
use std::fmt;

use super::Claim;

/// Outcome label for one claim.
///
/// `Verified`, `Inaccurate` and `False` come from the upstream classifier.
/// `Error` is only ever assigned locally when verification could not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictStatus {
    Verified,
    Inaccurate,
    False,
    Error,
}

impl VerdictStatus {
    pub const CLASSIFIED: [VerdictStatus; 3] = [
        VerdictStatus::Verified,
        VerdictStatus::Inaccurate,
        VerdictStatus::False,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VerdictStatus::Verified => "Verified",
            VerdictStatus::Inaccurate => "Inaccurate",
            VerdictStatus::False => "False",
            VerdictStatus::Error => "Error",
        }
    }

    /// Parse a label produced by the classifier. `Error` is not accepted here.
    pub fn from_classifier_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::CLASSIFIED
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(raw))
    }

    pub fn marker(&self) -> &'static str {
        match self {
            VerdictStatus::Verified => "✅",
            VerdictStatus::Inaccurate => "⚠️",
            VerdictStatus::False => "❌",
            VerdictStatus::Error => "🔴",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verification result for exactly one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub claim: Claim,
    pub status: VerdictStatus,
    pub explanation: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Verdict {
    /// Verdict recorded when retrieval or classification failed.
    pub fn error(claim: Claim, cause: impl fmt::Display) -> Self {
        Self {
            claim,
            status: VerdictStatus::Error,
            explanation: format!("Could not verify: {}", cause),
            sources: Vec::new(),
        }
    }
}

/// Per-status counts over one run. Derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub verified_count: usize,
    pub inaccurate_count: usize,
    pub false_count: usize,
    pub error_count: usize,
    pub total: usize,
}

impl VerificationSummary {
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let mut summary = Self::default();
        for verdict in verdicts {
            match verdict.status {
                VerdictStatus::Verified => summary.verified_count += 1,
                VerdictStatus::Inaccurate => summary.inaccurate_count += 1,
                VerdictStatus::False => summary.false_count += 1,
                VerdictStatus::Error => summary.error_count += 1,
            }
        }
        summary.total = verdicts.len();
        summary
    }

    pub fn count(&self, status: VerdictStatus) -> usize {
        match status {
            VerdictStatus::Verified => self.verified_count,
            VerdictStatus::Inaccurate => self.inaccurate_count,
            VerdictStatus::False => self.false_count,
            VerdictStatus::Error => self.error_count,
        }
    }
}
