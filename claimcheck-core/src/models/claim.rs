use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One atomic, checkable factual assertion pulled from a document.
///
/// Always non-empty after trimming; the stored text is the trimmed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Claim(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("claim text is empty")]
pub struct EmptyClaim;

impl Claim {
    pub fn new(text: impl Into<String>) -> Result<Self, EmptyClaim> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmptyClaim);
        }
        if trimmed.len() == text.len() {
            Ok(Self(text))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form capped at `max_chars` characters, suffixed with `...` when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.0.chars().count() <= max_chars {
            return self.0.clone();
        }
        let mut out: String = self.0.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

impl TryFrom<String> for Claim {
    type Error = EmptyClaim;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Claim> for String {
    fn from(claim: Claim) -> Self {
        claim.0
    }
}

impl AsRef<str> for Claim {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
