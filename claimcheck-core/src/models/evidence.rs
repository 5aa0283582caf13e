use serde::{Deserialize, Serialize};

/// A single search hit backing (or refuting) a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Source URI as reported by the search backend.
    pub source: String,
    pub snippet: String,
}

impl EvidenceItem {
    pub fn new(source: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            snippet: snippet.into(),
        }
    }
}
