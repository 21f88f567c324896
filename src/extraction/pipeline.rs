//! The `extract` operation: client → interpreter → normalizer.

use tokio_util::sync::CancellationToken;

use super::client::ExtractionClient;
use super::error::ExtractionError;
use super::interpret::interpret;
use super::normalize::normalize_with_report;
use crate::task::Task;

/// Extracts tasks from sanitized transcripts.
///
/// Holds no per-request state, so one instance serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct TaskExtractor {
    client: ExtractionClient,
}

impl TaskExtractor {
    pub fn new(client: ExtractionClient) -> Self {
        Self { client }
    }

    /// Extract tasks from `transcript`, which must already be sanitized and
    /// non-empty.
    ///
    /// An empty list is a normal outcome. Dropping the returned future
    /// cancels any in-flight call or backoff.
    pub async fn extract(&self, transcript: &str) -> Result<Vec<Task>, ExtractionError> {
        self.extract_with_cancel(transcript, &CancellationToken::new())
            .await
    }

    /// Like [`extract`](Self::extract), returning
    /// [`ExtractionError::Cancelled`] once `cancel` fires. No partial list is
    /// ever returned.
    pub async fn extract_with_cancel(
        &self,
        transcript: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Task>, ExtractionError> {
        let response = self.client.invoke_with_cancel(transcript, cancel).await?;
        let candidates = interpret(&response)?;
        let report = normalize_with_report(&candidates);

        tracing::info!(
            candidates = candidates.len(),
            accepted = report.tasks.len(),
            rejected = report.rejected.len(),
            "Extracted tasks from transcript"
        );

        Ok(report.tasks)
    }
}
