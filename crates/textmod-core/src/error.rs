use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextModError {
    #[error("classification failed: {0}")]
    Classification(String),

    #[error("no project files contain \"{search_term}\"")]
    NoCandidateFiles { search_term: String },

    #[error("{files} file(s) mention \"{search_term}\" but no text nodes matched it")]
    NoNodesExtracted { search_term: String, files: usize },

    #[error("batch {batch_id} failed: {reason}")]
    BatchOracle { batch_id: String, reason: String },

    #[error("path escapes the project root: {0}")]
    PathOutsideRoot(String),

    #[error("text replacement needs both a search term and a replacement term")]
    MissingTerms,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TextModError>;
