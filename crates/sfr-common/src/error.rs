//! Error taxonomy for the ePub ingestion pipeline
//!
//! Every failure that can terminate a single record's processing is a variant
//! here. Failures are caught at the record boundary and converted into one
//! result event; they never abort sibling records in the same batch.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Per-record failure kinds
#[derive(Error, Debug)]
pub enum IngestError {
    /// The source address did not match the recognized ePub naming pattern.
    /// Fatal per record, never retried.
    #[error("source address did not match the ePub naming pattern: {0}")]
    Regex(String),

    /// The upstream fetch failed. Carries the upstream status code where one
    /// was received, 502 when the request never produced a response.
    #[error("upstream fetch failed with status {status}: {message}")]
    Transport { status: u16, message: String },

    /// The byte stream errored before the full document was accumulated.
    /// A partial buffer is never surfaced as complete.
    #[error("stream accumulation failed before completion: {0}")]
    StreamToBuffer(String),

    /// The archive container could not be parsed. Parts already uploaded
    /// before the failure are not rolled back.
    #[error("malformed archive container: {0}")]
    ArchiveDecode(String),

    /// The accessibility scoring collaborator failed or timed out.
    #[error("accessibility report failed: {0}")]
    AccessibilityReport(String),

    /// A storage put or probe failed in a way that is not a precondition
    /// outcome.
    #[error("storage operation failed: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Stable result-event code for this failure kind
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Regex(_) => "regex-failure",
            IngestError::Transport { .. } => "transport-failure",
            IngestError::StreamToBuffer(_) => "stream-to-buffer",
            IngestError::ArchiveDecode(_) => "archive-decode",
            IngestError::AccessibilityReport(_) => "accessibility-report",
            IngestError::Store(_) => "store-failure",
            IngestError::Config(_) => "config-failure",
        }
    }

    /// Status carried on the result event for this failure kind
    pub fn status(&self) -> u16 {
        match self {
            IngestError::Regex(_) => 400,
            IngestError::Transport { status, .. } => *status,
            IngestError::StreamToBuffer(_) => 500,
            IngestError::ArchiveDecode(_) => 500,
            IngestError::AccessibilityReport(_) => 502,
            IngestError::Store(_) => 502,
            IngestError::Config(_) => 500,
        }
    }
}
