//! Task mutation data structure.
//!
//! A [`Task`] is one committed record state destined for the search index.
//! The write path constructs it after a successful commit against the primary
//! store and hands it to the pipeline through the mutation channel. Its serde
//! representation doubles as the dead-letter payload format, so the full
//! struct must round-trip through JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("unknown task status: {0}")]
    UnknownStatus(String),
}

/// Lifecycle state of a task.
///
/// Serialized as the uppercase strings `"TODO"`, `"PENDING"`, `"COMPLETED"`
/// everywhere the status leaves the process (index documents, dead-letter
/// payloads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    Pending,
    Completed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
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
            "TODO" => Ok(Self::Todo),
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(TaskError::UnknownStatus(other.to_string())),
        }
    }
}

/// One task state to be reflected in the search index.
///
/// # Example
///
/// ```
/// use task_sync::{Task, TaskStatus};
///
/// let task = Task::new("buy milk", "2 litres", TaskStatus::Todo).unwrap();
/// assert_eq!(task.status, TaskStatus::Todo);
/// assert!(Task::new("", "", TaskStatus::Todo).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Record identifier, unique within the primary store.
    /// Zero until the store assigns one.
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task. The title must be non-empty.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        status: TaskStatus,
    ) -> Result<Self, TaskError> {
        let title = title.into();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        let now = Utc::now();
        Ok(Self {
            id: 0,
            title,
            content: content.into(),
            status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the title, refreshing `updated_at`.
    pub fn update_title(&mut self, title: impl Into<String>) -> Result<(), TaskError> {
        let title = title.into();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        self.title = title;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the content, refreshing `updated_at`.
    pub fn update_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.updated_at = Utc::now();
    }

    /// Transition the lifecycle state, refreshing `updated_at`.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task() {
        let task = Task::new("buy milk", "2 litres", TaskStatus::Todo).unwrap();
        assert_eq!(task.id, 0);
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.content, "2 litres");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_empty_title_rejected() {
        assert_eq!(
            Task::new("", "content", TaskStatus::Todo),
            Err(TaskError::EmptyTitle)
        );

        let mut task = Task::new("title", "", TaskStatus::Todo).unwrap();
        assert_eq!(task.update_title(""), Err(TaskError::EmptyTitle));
        assert_eq!(task.title, "title");
    }

    #[test]
    fn test_update_refreshes_timestamp() {
        let mut task = Task::new("title", "", TaskStatus::Todo).unwrap();
        let created = task.created_at;

        task.update_content("new content");
        assert_eq!(task.content, "new content");
        assert!(task.updated_at >= created);

        task.set_status(TaskStatus::Completed);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TaskStatus::Todo.to_string(), "TODO");
        assert_eq!(TaskStatus::Pending.to_string(), "PENDING");
        assert_eq!(TaskStatus::Completed.to_string(), "COMPLETED");

        assert_eq!("TODO".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!("PENDING".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!(
            "COMPLETED".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert_eq!(
            "DONE".parse::<TaskStatus>(),
            Err(TaskError::UnknownStatus("DONE".to_string()))
        );
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, r#""COMPLETED""#);

        let status: TaskStatus = serde_json::from_str(r#""PENDING""#).unwrap();
        assert_eq!(status, TaskStatus::Pending);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut task = Task::new("buy milk", "2 litres", TaskStatus::Todo).unwrap();
        task.id = 42;

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();

        assert_eq!(back, task);
    }
}
