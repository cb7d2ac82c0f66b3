//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::domain::{DueDateError, Task, TaskDraft, format_timestamp, parse_due_date};

// =============================================================================
// Task DTOs
// =============================================================================

/// Body of `POST /tasks` and `PUT /tasks/{id}`.
///
/// An update replaces every client-controlled field, so omitted optional
/// fields reset to their defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// RFC 3339 timestamp. Absent or empty means no due date.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl TaskRequest {
    /// Converts the body into a draft. Field limits are checked by the service.
    ///
    /// # Errors
    ///
    /// Returns `DueDateError` for a non-empty, non-RFC 3339 `due_date`.
    pub fn into_draft(self) -> Result<TaskDraft, DueDateError> {
        let due_date = match self.due_date.as_deref() {
            Some(raw) => parse_due_date(raw)?,
            None => None,
        };

        Ok(TaskDraft {
            title: self.title,
            description: self.description,
            due_date,
            completed: self.completed,
        })
    }
}

/// A task as returned to its owner. The owner id is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub due_date: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.as_i32(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.as_ref().map(format_timestamp),
            completed: task.completed,
            created_at: format_timestamp(&task.created_at),
            updated_at: format_timestamp(&task.updated_at),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self::from(&task)
    }
}
