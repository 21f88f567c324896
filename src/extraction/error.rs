use thiserror::Error;

use crate::llm::LlmError;

/// Pipeline-level failure. Exactly one of these reaches the caller when
/// extraction does not produce a task list.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Timeouts or retryable service errors on every attempt.
    #[error("Generation service unavailable after {attempts} attempt(s): {source}")]
    TransientService {
        attempts: u32,
        #[source]
        source: LlmError,
    },

    /// Content was present but is not JSON, even after stripping preamble.
    #[error("Generation service output is not valid JSON: {source}")]
    MalformedOutput {
        #[source]
        source: serde_json::Error,
    },

    #[error("Generation service response contains no content")]
    EmptyResponse,

    /// A non-retryable failure, e.g. a rejected API key.
    #[error("Unexpected error extracting tasks: {source}")]
    Unexpected {
        #[source]
        source: LlmError,
    },

    /// The caller gave up before the pipeline finished.
    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::TransientService { .. } => "transient_service_error",
            ExtractionError::MalformedOutput { .. } => "malformed_output",
            ExtractionError::EmptyResponse => "empty_response",
            ExtractionError::Unexpected { .. } => "unexpected_error",
            ExtractionError::Cancelled => "cancelled",
        }
    }
}
