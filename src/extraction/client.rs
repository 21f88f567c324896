//! Request/response lifecycle with the generation service.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::ExtractionError;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError, RawResponse, RetryConfig};

/// Format contract sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a JSON-only extractor. Given a transcript, return EXACTLY a JSON array \
(and nothing else) where each element is an object with keys: id (string), text (string), \
priority (one of: low, medium, high), tags (array of strings). If a field is unknown, set it \
to null, empty string, or an empty array. Do NOT output explanations or markdown.";

const EXAMPLE_OUTPUT: &str = r#"Example output:
[
  { "id": "1", "text": "Fix payment gateway race condition", "priority": "high", "tags": ["payments","backend"] },
  { "id": "2", "text": "Run full regression tests over weekend", "priority": "high", "tags": ["qa","regression"] }
]"#;

/// Build the system + user messages for one transcript.
pub fn build_messages(transcript: &str) -> Vec<ChatMessage> {
    let user = format!("{EXAMPLE_OUTPUT}\n\nTranscript:\n'''{transcript}'''");
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Tunables for the extraction call.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub model: String,
    /// Output-length ceiling passed as `max_tokens`.
    pub max_tokens: u64,
    pub retry: RetryConfig,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 800,
            retry: RetryConfig::default(),
        }
    }
}

/// Whether a failed attempt may be repeated.
enum Disposition {
    Transient(LlmError),
    Terminal(LlmError),
}

impl From<LlmError> for Disposition {
    fn from(error: LlmError) -> Self {
        if error.is_transient() {
            Disposition::Transient(error)
        } else {
            Disposition::Terminal(error)
        }
    }
}

enum RetryState {
    /// About to make attempt `n` (1-based).
    Attempt(u32),
    /// Waiting `delay` before attempt `next`.
    Backoff { next: u32, delay: Duration },
}

/// Calls the generation service with retry and backoff.
///
/// Cheap to clone; clones share the underlying [`LlmClient`].
#[derive(Clone)]
pub struct ExtractionClient {
    llm: Arc<dyn LlmClient>,
    settings: ExtractionSettings,
}

impl ExtractionClient {
    pub fn new(llm: Arc<dyn LlmClient>, settings: ExtractionSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    /// Obtain a raw response for `transcript`.
    pub async fn invoke(&self, transcript: &str) -> Result<RawResponse, ExtractionError> {
        self.invoke_with_cancel(transcript, &CancellationToken::new())
            .await
    }

    /// Like [`invoke`](Self::invoke), aborting at the outbound call or the
    /// backoff sleep as soon as `cancel` fires.
    pub async fn invoke_with_cancel(
        &self,
        transcript: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, ExtractionError> {
        let messages = build_messages(transcript);
        let retry = &self.settings.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut state = RetryState::Attempt(1);

        loop {
            state = match state {
                RetryState::Attempt(attempt) => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
                        outcome = self.attempt(&messages) => outcome,
                    };

                    let error = match outcome {
                        Ok(response) => {
                            if attempt > 1 {
                                tracing::info!("Extraction request succeeded on attempt {}", attempt);
                            }
                            return Ok(response);
                        }
                        Err(error) => error,
                    };

                    match Disposition::from(error) {
                        Disposition::Terminal(error) => {
                            tracing::error!("Extraction request failed (non-retryable): {}", error);
                            return Err(ExtractionError::Unexpected { source: error });
                        }
                        Disposition::Transient(error) if !retry.should_retry(&error, attempt) => {
                            tracing::error!(
                                "Extraction request failed after {} attempts: {}",
                                attempt,
                                error
                            );
                            return Err(ExtractionError::TransientService {
                                attempts: attempt,
                                source: error,
                            });
                        }
                        Disposition::Transient(error) => {
                            let delay = retry.backoff_delay(attempt);
                            tracing::warn!(
                                "Extraction attempt {}/{} failed with {}, retrying in {:?}: {}",
                                attempt,
                                max_attempts,
                                error.kind,
                                delay,
                                error.message
                            );
                            RetryState::Backoff {
                                next: attempt + 1,
                                delay,
                            }
                        }
                    }
                }
                RetryState::Backoff { next, delay } => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    RetryState::Attempt(next)
                }
            };
        }
    }

    /// One call, bounded by the per-attempt timeout.
    async fn attempt(&self, messages: &[ChatMessage]) -> Result<RawResponse, LlmError> {
        let options = ChatOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.settings.max_tokens),
        };
        let timeout = self.settings.retry.request_timeout;

        match tokio::time::timeout(
            timeout,
            self.llm
                .chat_completion(&self.settings.model, messages, options),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(LlmError::timeout(format!(
                "No response within {:?}",
                timeout
            ))),
        }
    }
}
