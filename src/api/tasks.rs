//! Saved task endpoints.
//!
//! - List tasks
//! - Filter and sort tasks
//! - Update a task's text, status or priority
//! - Delete a task

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::routes::AppState;
use crate::store::{SortField, SortOrder, StoreError, StoredTask, TaskFilter, TaskUpdate};
use crate::task::{Priority, TaskStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks))
        .route("/filter", post(filter_tasks))
        .route("/:id", patch(update_task).delete(delete_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FilterRequest {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring of the task text
    pub keyword: Option<String>,
    /// Any of these tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Unknown fields sort by creation time
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default)
    pub order: Option<String>,
}

impl From<FilterRequest> for TaskFilter {
    fn from(req: FilterRequest) -> Self {
        Self {
            status: req.status,
            priority: req.priority,
            keyword: req.keyword,
            tags: req.tags,
            sort_by: req
                .sort_by
                .as_deref()
                .map(SortField::parse_lenient)
                .unwrap_or_default(),
            order: req
                .order
                .as_deref()
                .map(SortOrder::parse_lenient)
                .unwrap_or_default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

fn internal(e: StoreError) -> (StatusCode, String) {
    tracing::error!("Task store failure: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Task storage is unavailable.".to_string(),
    )
}

fn not_found(id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Task {} not found", id))
}

/// All tasks, newest first.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredTask>>, (StatusCode, String)> {
    state.store.list().await.map(Json).map_err(internal)
}

async fn filter_tasks(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<Vec<StoredTask>>, (StatusCode, String)> {
    let filter = TaskFilter::from(req);
    tracing::debug!(?filter, "Filtering tasks");
    state.store.filter(&filter).await.map(Json).map_err(internal)
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<StoredTask>, (StatusCode, String)> {
    match state.store.update(&id, &update).await {
        Ok(Some(task)) => Ok(Json(task)),
        Ok(None) => Err(not_found(&id)),
        Err(StoreError::Invalid(e)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => Err(internal(e)),
    }
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if state.store.delete(&id).await.map_err(internal)? {
        tracing::info!("Deleted task {}", id);
        Ok(Json(json!({ "status": "deleted" })))
    } else {
        Err(not_found(&id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::routes::tests::{send, test_state};
    use crate::api::AppState;
    use crate::llm::testing::ScriptedLlm;
    use crate::task::{Priority, Task};
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn seeded() -> (Arc<AppState>, Vec<String>) {
        let state = test_state(Arc::new(ScriptedLlm::replying("[]")));
        let tasks = vec![
            Task::new("1", "Fix the login bug", Priority::High, vec!["bug".into()]).unwrap(),
            Task::new("2", "Review the PR", Priority::Medium, vec!["code".into(), "review".into()])
                .unwrap(),
            Task::new("3", "Book the meeting room", Priority::Low, vec![]).unwrap(),
        ];
        let ids = state
            .store
            .create_tasks(&tasks)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        (state, ids)
    }

    fn texts(body: &Value) -> Vec<&str> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|t| t["text"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (state, _) = seeded().await;
        let (status, body) = send(&state, "GET", "/api/tasks", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            texts(&body),
            ["Book the meeting room", "Review the PR", "Fix the login bug"]
        );
    }

    #[tokio::test]
    async fn test_filter_by_keyword_tags_and_sort() {
        let (state, _) = seeded().await;

        let (_, body) = send(
            &state,
            "POST",
            "/api/tasks/filter",
            Some(json!({"keyword": "THE", "sort_by": "priority", "order": "asc"})),
        )
        .await;
        assert_eq!(texts(&body), ["Book the meeting room", "Review the PR", "Fix the login bug"]);

        let (_, body) = send(
            &state,
            "POST",
            "/api/tasks/filter",
            Some(json!({"tags": ["review", "bug"], "sort_by": "text", "order": "asc"})),
        )
        .await;
        assert_eq!(texts(&body), ["Fix the login bug", "Review the PR"]);

        let (_, body) = send(
            &state,
            "POST",
            "/api/tasks/filter",
            Some(json!({"priority": "low", "sort_by": "nonsense"})),
        )
        .await;
        assert_eq!(texts(&body), ["Book the meeting room"]);
    }

    #[tokio::test]
    async fn test_update_task() {
        let (state, ids) = seeded().await;
        let uri = format!("/api/tasks/{}", ids[0]);

        let (status, body) = send(
            &state,
            "PATCH",
            &uri,
            Some(json!({"status": "completed", "text": "  Fix the signup bug "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["text"], "Fix the signup bug");
        assert_eq!(body["priority"], "high");

        let (status, _) = send(&state, "PATCH", &uri, Some(json!({"text": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            "PATCH",
            "/api/tasks/missing",
            Some(json!({"status": "completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_task() {
        let (state, ids) = seeded().await;
        let uri = format!("/api/tasks/{}", ids[1]);

        let (status, body) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "deleted"}));

        let (status, _) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(state.store.list().await.unwrap().len(), 2);
    }
}
