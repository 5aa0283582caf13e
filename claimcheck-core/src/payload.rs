//! Decoding of the semi-structured text returned by the completion service.
//!
//! The model is asked for bare JSON but may still wrap it in a markdown code
//! fence. Every payload goes through [`strip_code_fences`] and is then decoded
//! against an explicit shape; violations come back as [`PayloadError`].

use serde::Deserialize;
use thiserror::Error;

use crate::models::{Claim, VerdictStatus};

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected shape: {0}")]
    Schema(String),
}

/// Remove a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
///
/// Text without a leading fence is only trimmed, so applying this twice gives
/// the same result as applying it once.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match after_open.find("```") {
        Some(end) => &after_open[..end],
        None => after_open,
    };
    body.strip_prefix("json").unwrap_or(body).trim()
}

#[derive(Deserialize)]
struct ClaimEntry {
    claim: String,
}

/// Decode an extraction response: a JSON array of `{"claim": "..."}` objects.
///
/// Entries whose text is blank after trimming are dropped; order is preserved.
pub fn decode_claims(raw: &str) -> Result<Vec<Claim>, PayloadError> {
    let body = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_array() {
        return Err(PayloadError::Schema(format!(
            "expected a JSON array of claims, got {}",
            json_kind(&value)
        )));
    }

    let entries: Vec<ClaimEntry> = serde_json::from_value(value)?;
    let total = entries.len();
    let claims: Vec<Claim> = entries
        .into_iter()
        .filter_map(|e| Claim::new(e.claim).ok())
        .collect();

    if claims.len() < total {
        tracing::debug!(
            dropped = total - claims.len(),
            "Dropped blank claims from extraction response"
        );
    }
    Ok(claims)
}

/// Classification as returned by the model, before the claim is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: VerdictStatus,
    pub explanation: String,
    pub sources: Vec<String>,
}

#[derive(Deserialize)]
struct ClassificationWire {
    status: String,
    explanation: String,
    #[serde(default)]
    sources: Vec<String>,
}

/// Decode a verification response: `{"status", "explanation", "sources"}`.
///
/// `status` must be one of the three classifier labels; `sources` may be omitted.
pub fn decode_classification(raw: &str) -> Result<Classification, PayloadError> {
    let body = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(PayloadError::Schema(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    let wire: ClassificationWire = serde_json::from_value(value)?;
    let status = VerdictStatus::from_classifier_label(&wire.status).ok_or_else(|| {
        PayloadError::Schema(format!("unknown status label {:?}", wire.status))
    })?;

    Ok(Classification {
        status,
        explanation: wire.explanation,
        sources: wire.sources,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
