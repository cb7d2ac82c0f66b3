//! RPC messages in their JSON mapping.
//!
//! Fields are camelCase on the wire; snake_case spellings are accepted on
//! input. Scalar fields follow proto3 defaults, so an omitted field reads as
//! zero, empty or false.

use serde::{Deserialize, Serialize};

use crate::domain::{DueDateError, Task, TaskDraft, format_timestamp, parse_due_date};

/// `taskmanager.v1.Task`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskMessage {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// RFC 3339, or empty for no due date.
    #[serde(alias = "due_date")]
    pub due_date: String,
    pub completed: bool,
    /// Output only; ignored on input.
    #[serde(alias = "created_at")]
    pub created_at: String,
    /// Output only; ignored on input.
    #[serde(alias = "updated_at")]
    pub updated_at: String,
}

impl TaskMessage {
    /// Extracts the client-controlled fields.
    ///
    /// # Errors
    ///
    /// Returns `DueDateError` for a non-empty, non-RFC 3339 `dueDate`.
    pub fn into_draft(self) -> Result<TaskDraft, DueDateError> {
        Ok(TaskDraft {
            due_date: parse_due_date(&self.due_date)?,
            title: self.title,
            description: self.description,
            completed: self.completed,
        })
    }
}

impl From<&Task> for TaskMessage {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.as_i32(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task
                .due_date
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            completed: task.completed,
            created_at: format_timestamp(&task.created_at),
            updated_at: format_timestamp(&task.updated_at),
        }
    }
}

/// `taskmanager.v1.TaskIdRequest`, input of `GetTask` and `DeleteTask`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskIdRequest {
    pub id: i32,
}

/// `google.protobuf.Empty`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// `taskmanager.v1.TaskList`, output of `ListTasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskList {
    pub tasks: Vec<TaskMessage>,
}
