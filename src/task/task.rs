//! Task type and its invariants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a task cannot be constructed or updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task candidate is not a key/value object")]
    NotAnObject,

    #[error("Task text is empty")]
    EmptyText,

    #[error("Task id is empty")]
    EmptyId,

    #[error("Tag at position {position} is not a string")]
    InvalidTag { position: usize },

    #[error("Unknown priority: {0}")]
    InvalidPriority(String),

    #[error("Unknown status: {0}")]
    InvalidStatus(String),
}

/// How urgent a task is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive parse. Callers wanting leniency lower-case first.
impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TaskError::InvalidPriority(other.to_string())),
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(TaskError::InvalidStatus(other.to_string())),
        }
    }
}

/// An actionable task extracted from a transcript.
///
/// # Invariants
/// - `id` and `text` are non-empty and trimmed
/// - every tag is non-empty and trimmed
/// - `status` is [`TaskStatus::Pending`]; the store owns later transitions
///
/// Fields are private so a `Task` cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: String,
    text: String,
    priority: Priority,
    tags: Vec<String>,
    status: TaskStatus,
}

impl Task {
    /// Build a validated task.
    ///
    /// Blank tags are discarded; blank text or id is an error.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        priority: Priority,
        tags: Vec<String>,
    ) -> Result<Self, TaskError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(TaskError::EmptyId);
        }

        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }

        let tags = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            id,
            text,
            priority,
            tags,
            status: TaskStatus::Pending,
        })
    }

    /// Provisional identifier, unique within one extraction batch.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }
}
