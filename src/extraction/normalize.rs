//! Maps raw candidates onto canonical [`Task`]s.
//!
//! Each candidate is handled on its own. A candidate that cannot become a
//! valid task is logged and dropped; it never aborts the batch.

use std::collections::HashSet;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::interpret::RawCandidate;
use crate::task::{Priority, Task, TaskError};

/// Field names seen in service output, most preferred first.
const TEXT_KEYS: &[&str] = &["text", "title", "task"];
const ID_KEYS: &[&str] = &["id", "task_id"];
const TAG_KEYS: &[&str] = &["tags", "labels"];
const PRIORITY_KEY: &str = "priority";

/// A candidate that was dropped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRejection {
    /// Position in the candidate list.
    pub index: usize,
    pub reason: TaskError,
}

/// Outcome of normalizing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Surviving tasks in candidate order.
    pub tasks: Vec<Task>,
    pub rejected: Vec<EntryRejection>,
}

/// Normalize a batch, keeping only the valid tasks.
pub fn normalize(candidates: &[RawCandidate]) -> Vec<Task> {
    normalize_with_report(candidates).tasks
}

/// Normalize a batch, also reporting every dropped entry.
pub fn normalize_with_report(candidates: &[RawCandidate]) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let mut seen_ids = HashSet::new();

    for (index, candidate) in candidates.iter().enumerate() {
        match normalize_entry(candidate, &mut seen_ids) {
            Ok(task) => report.tasks.push(task),
            Err(reason) => {
                tracing::warn!("Dropping task candidate #{}: {} (raw={})", index, reason, candidate);
                report.rejected.push(EntryRejection { index, reason });
            }
        }
    }

    report
}

fn normalize_entry(candidate: &RawCandidate, seen_ids: &mut HashSet<String>) -> Result<Task, TaskError> {
    let fields = candidate.as_object().ok_or(TaskError::NotAnObject)?;

    let text = resolve_text(fields).ok_or(TaskError::EmptyText)?;
    let priority = resolve_priority(fields);
    let tags = resolve_tags(fields)?;

    let id = match resolve_id(fields) {
        Some(id) if !seen_ids.contains(&id) => id,
        Some(id) => {
            let fresh = Uuid::new_v4().to_string();
            tracing::warn!("Duplicate task id {:?} in batch, replaced with {}", id, fresh);
            fresh
        }
        None => Uuid::new_v4().to_string(),
    };

    let task = Task::new(id, text, priority, tags)?;
    seen_ids.insert(task.id().to_string());
    Ok(task)
}

/// First value under `keys` that `accept` takes.
fn first_accepted<'a, T>(
    fields: &'a Map<String, Value>,
    keys: &[&str],
    accept: impl Fn(&'a Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(accept)
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn resolve_text(fields: &Map<String, Value>) -> Option<String> {
    first_accepted(fields, TEXT_KEYS, |value| {
        value.as_str().and_then(non_blank).map(str::to_string)
    })
}

/// Strings as-is, numbers rendered in decimal.
fn resolve_id(fields: &Map<String, Value>) -> Option<String> {
    first_accepted(fields, ID_KEYS, |value| match value {
        Value::String(s) => non_blank(s).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn resolve_priority(fields: &Map<String, Value>) -> Priority {
    fields
        .get(PRIORITY_KEY)
        .and_then(Value::as_str)
        .and_then(|p| p.to_lowercase().parse().ok())
        .unwrap_or_default()
}

/// A list must hold only strings; a string is split on commas. Blank
/// segments are discarded either way.
fn resolve_tags(fields: &Map<String, Value>) -> Result<Vec<String>, TaskError> {
    let source = first_accepted(fields, TAG_KEYS, |value| match value {
        Value::Array(items) if !items.is_empty() => Some(value),
        Value::String(s) if !s.trim().is_empty() => Some(value),
        _ => None,
    });

    match source {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| match item {
                Value::String(tag) => non_blank(tag).map(|t| Ok(t.to_string())),
                _ => Some(Err(TaskError::InvalidTag { position })),
            })
            .collect(),
        Some(Value::String(joined)) => Ok(split_tags(joined)),
        _ => Ok(Vec::new()),
    }
}

fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter_map(non_blank)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one(candidate: Value) -> Task {
        let mut tasks = normalize(&[candidate]);
        assert_eq!(tasks.len(), 1, "candidate should survive");
        tasks.remove(0)
    }

    #[test]
    fn test_text_aliases_in_order() {
        assert_eq!(one(json!({"text": "a", "title": "b"})).text(), "a");
        assert_eq!(one(json!({"title": "b", "task": "c"})).text(), "b");
        assert_eq!(one(json!({"task": "c"})).text(), "c");
        assert_eq!(one(json!({"text": "", "title": "b"})).text(), "b");
        assert_eq!(one(json!({"text": 5, "task": "c"})).text(), "c");
    }

    #[test]
    fn test_missing_text_is_dropped() {
        let candidates = vec![
            json!({"text": "keep"}),
            json!({"priority": "high"}),
            json!({"text": "   "}),
            json!({"title": null}),
        ];
        let report = normalize_with_report(&candidates);

        assert_eq!(report.tasks.len(), 1);
        assert!(report.tasks.len() < candidates.len());
        assert_eq!(
            report.rejected,
            vec![
                EntryRejection { index: 1, reason: TaskError::EmptyText },
                EntryRejection { index: 2, reason: TaskError::EmptyText },
                EntryRejection { index: 3, reason: TaskError::EmptyText },
            ]
        );
    }

    #[test]
    fn test_non_objects_are_dropped() {
        let report = normalize_with_report(&[json!("text"), json!(null), json!({"text": "ok"})]);
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.rejected[0].reason, TaskError::NotAnObject);
        assert_eq!(report.rejected[1].reason, TaskError::NotAnObject);
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(one(json!({"text": "a"})).priority(), Priority::Medium);
        assert_eq!(one(json!({"text": "a", "priority": "urgent"})).priority(), Priority::Medium);
        assert_eq!(one(json!({"text": "a", "priority": 3})).priority(), Priority::Medium);
        assert_eq!(one(json!({"text": "a", "priority": null})).priority(), Priority::Medium);
        assert_eq!(one(json!({"text": "a", "priority": " high"})).priority(), Priority::Medium);
        assert_eq!(one(json!({"text": "a", "priority": "HIGH"})).priority(), Priority::High);
        assert_eq!(one(json!({"text": "a", "priority": "Low"})).priority(), Priority::Low);
    }

    #[test]
    fn test_comma_joined_tags_are_split() {
        assert_eq!(one(json!({"text": "a", "tags": "a, b ,c"})).tags(), ["a", "b", "c"]);
        assert_eq!(one(json!({"text": "a", "tags": "x,, ,y"})).tags(), ["x", "y"]);
    }

    #[test]
    fn test_tag_aliases_and_fallbacks() {
        assert_eq!(one(json!({"text": "a", "labels": ["ops"]})).tags(), ["ops"]);
        assert_eq!(one(json!({"text": "a", "tags": [], "labels": "qa"})).tags(), ["qa"]);
        assert_eq!(one(json!({"text": "a", "tags": 7})).tags(), Vec::<String>::new());
        assert!(one(json!({"text": "a"})).tags().is_empty());
        assert_eq!(one(json!({"text": "a", "tags": [" bug ", ""]})).tags(), ["bug"]);
    }

    #[test]
    fn test_non_string_tag_rejects_entry() {
        let report = normalize_with_report(&[json!({"text": "a", "tags": ["ok", 2]})]);
        assert!(report.tasks.is_empty());
        assert_eq!(report.rejected[0].reason, TaskError::InvalidTag { position: 1 });
    }

    #[test]
    fn test_ids_are_kept_generated_or_deduplicated() {
        let tasks = normalize(&[
            json!({"id": "t-1", "text": "a"}),
            json!({"task_id": 42, "text": "b"}),
            json!({"text": "c"}),
            json!({"id": "t-1", "text": "d"}),
        ]);

        assert_eq!(tasks[0].id(), "t-1");
        assert_eq!(tasks[1].id(), "42");
        assert!(Uuid::parse_str(tasks[2].id()).is_ok());
        assert_ne!(tasks[3].id(), "t-1");

        let unique: HashSet<&str> = tasks.iter().map(Task::id).collect();
        assert_eq!(unique.len(), tasks.len());
    }

    #[test]
    fn test_order_is_preserved() {
        let tasks = normalize(&[
            json!({"text": "first"}),
            json!(17),
            json!({"text": "second"}),
            json!({"text": "third"}),
        ]);
        let texts: Vec<&str> = tasks.iter().map(Task::text).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let first = normalize(&[
            json!({"id": "1", "text": "Fix the login bug", "priority": "high", "tags": ["bug"]}),
            json!({"title": "Review the PR", "tags": "code,review"}),
            json!({"task": "Book room", "priority": "LOW", "labels": "ops"}),
        ]);

        let refed: Vec<Value> = first
            .iter()
            .map(|task| serde_json::to_value(task).unwrap())
            .collect();
        let second = normalize(&refed);

        assert_eq!(first, second);
    }
}
