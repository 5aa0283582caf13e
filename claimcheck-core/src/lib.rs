pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod models;
pub mod payload;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod verifier;

pub use config::{ClaimcheckConfig, Credentials};
pub use document::{
    check_document, AutoLoader, DocumentCheck, DocumentError, DocumentLoader, PdfLoader,
    PlainTextLoader, StagedDocument,
};
pub use error::ClaimcheckError;
pub use extractor::{ClaimExtractor, Extraction, ExtractionError};
pub use llm::{CompletionRequest, LlmConfig, LlmError, OpenAiChatClient, TextGenerator};
pub use models::{
    Claim, EvidenceItem, RunOutcome, Verdict, VerdictStatus, VerificationReport,
    VerificationSummary,
};
pub use pipeline::VerificationPipeline;
pub use progress::{NoopSink, ProgressSink, TracingSink};
pub use search::{EvidenceRetriever, SearchConfig, SearchError, TavilySearchClient};
pub use verifier::{ClaimVerifier, VerificationError};
