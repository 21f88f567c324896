//! Transcript submission endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::routes::AppState;
use crate::store::StoredTask;
use crate::text::sanitize;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(submit_transcript))
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub tasks: Vec<StoredTask>,
}

/// Sanitize the transcript, extract its tasks and save them.
async fn submit_transcript(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscriptRequest>,
) -> Result<Json<TranscriptResponse>, (StatusCode, String)> {
    let transcript = sanitize(&req.transcript);
    if transcript.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Transcript is empty.".to_string()));
    }

    let tasks = state.extractor.extract(&transcript).await.map_err(|e| {
        tracing::error!(kind = e.kind(), "Task extraction failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to extract tasks from transcript.".to_string(),
        )
    })?;

    if tasks.is_empty() {
        tracing::info!("No tasks found in transcript");
        return Ok(Json(TranscriptResponse { tasks: Vec::new() }));
    }

    let stored = state.store.create_tasks(&tasks).await.map_err(|e| {
        tracing::error!("Failed to save extracted tasks: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save tasks to database.".to_string(),
        )
    })?;

    Ok(Json(TranscriptResponse { tasks: stored }))
}
