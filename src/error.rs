use thiserror::Error;

/// Failures raised by the report engine and its backend boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReportError {
    /// A `recipes` or `prompts` array was missing from the payload.
    #[error("dataset shape error: missing array at {path}")]
    DatasetShape { path: String },

    /// Strict ingest refused a dataset whose prompt ids collide.
    #[error("duplicate prompt identity {id} shared by {count} prompts")]
    DuplicateIdentity { id: String, count: usize },

    #[error("prompt {prompt_id} not found")]
    NotFound { prompt_id: String },

    /// More than one prompt carries the id; nothing was written.
    #[error("prompt id {prompt_id} matches {count} prompts; refusing to write")]
    AmbiguousMatch { prompt_id: String, count: usize },

    #[error("failed to fetch report data: {0}")]
    Fetch(String),

    #[error("failed to save prompt {prompt_id}: {reason}")]
    Save { prompt_id: String, reason: String },
}

pub type ReportResult<T> = Result<T, ReportError>;
