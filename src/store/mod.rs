//! SQLite-backed task storage.
//!
//! Tasks are stored in a single `tasks` table. Tags are kept as a JSON array
//! in a TEXT column and queried with SQLite's built-in JSON functions.
//! Timestamps are RFC 3339 UTC strings with a fixed width, so they sort
//! lexically.
//!
//! rusqlite is synchronous, so every query runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::task::{Priority, Task, TaskError, TaskStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode or decode tags: {0}")]
    Tags(#[from] serde_json::Error),

    #[error("Stored timestamp is invalid: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Invalid task data: {0}")]
    Invalid(#[from] TaskError),

    #[error("Database worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// A task as persisted, with its durable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTask {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub status: TaskStatus,
    /// Provisional id assigned during extraction, if any.
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a stored task. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Priority,
    Status,
    Text,
}

impl SortField {
    /// Lenient parse; unknown names fall back to `created_at`.
    pub fn parse_lenient(name: &str) -> Self {
        match name {
            "updated_at" => SortField::UpdatedAt,
            "priority" => SortField::Priority,
            "status" => SortField::Status,
            "text" => SortField::Text,
            _ => SortField::CreatedAt,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Priority => {
                "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 END"
            }
            SortField::Status => "status",
            SortField::Text => "text COLLATE NOCASE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Lenient parse; anything but `asc` sorts descending.
    pub fn parse_lenient(name: &str) -> Self {
        if name.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query over stored tasks. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring of the task text.
    pub keyword: Option<String>,
    /// Matches tasks carrying any of these tags.
    pub tags: Vec<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
}

const TASK_COLUMNS: &str =
    "id, text, status, priority, tags, source_id, created_at, updated_at";

/// Raw column values, converted to [`StoredTask`] outside the row callback.
struct TaskRow {
    id: String,
    text: String,
    status: String,
    priority: String,
    tags: String,
    source_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            status: row.get(2)?,
            priority: row.get(3)?,
            tags: row.get(4)?,
            source_id: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_task(self) -> Result<StoredTask, StoreError> {
        Ok(StoredTask {
            id: self.id,
            text: self.text,
            status: self.status.parse()?,
            priority: self.priority.parse()?,
            tags: serde_json::from_str(&self.tags)?,
            source_id: self.source_id,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Task storage over one SQLite connection.
///
/// Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct TaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl TaskStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!("Failed to create {}: {}", parent.display(), e);
                }
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!("Opened task database at {}", path.display());
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                priority TEXT NOT NULL DEFAULT 'medium',
                tags TEXT NOT NULL DEFAULT '[]',
                source_id TEXT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `work` against the connection on the blocking pool.
    async fn run<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            work(&mut *conn)
        })
        .await?
    }

    /// Persist a batch of extracted tasks in one transaction.
    ///
    /// Every task gets a fresh durable id and `status = pending`; the
    /// extraction id is kept as `source_id`. Output order matches input.
    pub async fn create_tasks(&self, tasks: &[Task]) -> Result<Vec<StoredTask>, StoreError> {
        let now = now();
        let batch: Vec<StoredTask> = tasks
            .iter()
            .map(|task| StoredTask {
                id: Uuid::new_v4().to_string(),
                text: task.text().to_string(),
                priority: task.priority(),
                tags: task.tags().to_vec(),
                status: TaskStatus::Pending,
                source_id: Some(task.id().to_string()),
                created_at: now,
                updated_at: now,
            })
            .collect();

        let created = self
            .run(move |conn| {
                let stamp = format_timestamp(now);
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&format!(
                        "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                    ))?;
                    for stored in &batch {
                        stmt.execute(params![
                            stored.id,
                            stored.text,
                            stored.status.as_str(),
                            stored.priority.as_str(),
                            serde_json::to_string(&stored.tags)?,
                            stored.source_id,
                            stamp,
                            stamp,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(batch)
            })
            .await?;

        tracing::info!("Saved {} tasks", created.len());
        Ok(created)
    }

    pub async fn get(&self, id: &str) -> Result<Option<StoredTask>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| fetch(conn, &id)).await
    }

    /// All tasks, newest first.
    pub async fn list(&self) -> Result<Vec<StoredTask>, StoreError> {
        self.filter(&TaskFilter::default()).await
    }

    pub async fn filter(&self, filter: &TaskFilter) -> Result<Vec<StoredTask>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            args.push(status.as_str().to_string());
            clauses.push(format!("status = ?{}", args.len()));
        }
        if let Some(priority) = filter.priority {
            args.push(priority.as_str().to_string());
            clauses.push(format!("priority = ?{}", args.len()));
        }
        if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            args.push(keyword.to_lowercase());
            clauses.push(format!("instr(lower(text), ?{}) > 0", args.len()));
        }
        if !filter.tags.is_empty() {
            let mut placeholders = Vec::with_capacity(filter.tags.len());
            for tag in &filter.tags {
                args.push(tag.clone());
                placeholders.push(format!("?{}", args.len()));
            }
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(tasks.tags) WHERE json_each.value IN ({}))",
                placeholders.join(", ")
            ));
        }

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let order = filter.order.sql();
        sql.push_str(&format!(
            " ORDER BY {} {order}, rowid {order}",
            filter.sort_by.sql()
        ));

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), TaskRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(TaskRow::into_task).collect()
        })
        .await
    }

    /// Apply `update` to the task `id`. Returns `None` if it does not exist.
    pub async fn update(
        &self,
        id: &str,
        update: &TaskUpdate,
    ) -> Result<Option<StoredTask>, StoreError> {
        let text = match update.text.as_deref().map(str::trim) {
            Some("") => return Err(TaskError::EmptyText.into()),
            other => other.map(str::to_string),
        };
        let status = update.status;
        let priority = update.priority;
        let id = id.to_string();
        let stamp = format_timestamp(now());

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET \
                     text = COALESCE(?2, text), \
                     status = COALESCE(?3, status), \
                     priority = COALESCE(?4, priority), \
                     updated_at = ?5 \
                 WHERE id = ?1",
                params![
                    id,
                    text,
                    status.map(TaskStatus::as_str),
                    priority.map(Priority::as_str),
                    stamp,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            fetch(conn, &id)
        })
        .await
    }

    /// Delete the task `id`. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
    }
}

fn fetch(conn: &Connection, id: &str) -> Result<Option<StoredTask>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            TaskRow::from_row,
        )
        .optional()?;
    row.map(TaskRow::into_task).transpose()
}
