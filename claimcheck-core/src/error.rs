use thiserror::Error;

use crate::document::DocumentError;
use crate::llm::LlmError;
use crate::search::SearchError;

#[derive(Error, Debug)]
pub enum ClaimcheckError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing credential: {0} is not set in secrets or environment")]
    MissingCredential(&'static str),

    #[error("Completion client error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search client error: {0}")]
    Search(#[from] SearchError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
