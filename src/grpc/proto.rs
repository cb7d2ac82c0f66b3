//! `taskmanager.v1` messages and the generated service stubs.
//!
//! Field numbers follow `proto/taskmanager/v1/taskmanager.proto`.

use crate::domain::{self, DueDateError, TaskDraft, format_timestamp, parse_due_date};

#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/taskmanager.v1.TaskManager.rs"));
}

pub use generated::{task_manager_client, task_manager_server};

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Task {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub title: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(string, tag = "4")]
    pub due_date: String,
    #[prost(bool, tag = "5")]
    pub completed: bool,
    #[prost(string, tag = "6")]
    pub created_at: String,
    #[prost(string, tag = "7")]
    pub updated_at: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CreateTaskRequest {
    #[prost(string, tag = "1")]
    pub title: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub due_date: String,
    #[prost(bool, tag = "4")]
    pub completed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct GetTaskRequest {
    #[prost(int32, tag = "1")]
    pub id: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UpdateTaskRequest {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub title: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(string, tag = "4")]
    pub due_date: String,
    #[prost(bool, tag = "5")]
    pub completed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct DeleteTaskRequest {
    #[prost(int32, tag = "1")]
    pub id: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct DeleteTaskResponse {}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct ListTasksRequest {}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ListTasksResponse {
    #[prost(message, repeated, tag = "1")]
    pub tasks: Vec<Task>,
}

impl CreateTaskRequest {
    /// # Errors
    ///
    /// Returns `DueDateError` for a non-empty, non-RFC 3339 `due_date`.
    pub fn into_draft(self) -> Result<TaskDraft, DueDateError> {
        Ok(TaskDraft {
            due_date: parse_due_date(&self.due_date)?,
            title: self.title,
            description: self.description,
            completed: self.completed,
        })
    }
}

impl UpdateTaskRequest {
    /// # Errors
    ///
    /// Returns `DueDateError` for a non-empty, non-RFC 3339 `due_date`.
    pub fn into_draft(self) -> Result<TaskDraft, DueDateError> {
        Ok(TaskDraft {
            due_date: parse_due_date(&self.due_date)?,
            title: self.title,
            description: self.description,
            completed: self.completed,
        })
    }
}

impl From<&domain::Task> for Task {
    fn from(task: &domain::Task) -> Self {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, UserId};
    use chrono::{TimeZone, Utc};
    use prost::Message;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("2030-01-01T00:00:00Z")]
    fn test_create_request_due_date(#[case] due_date: &str) {
        let request = CreateTaskRequest {
            title: "A".to_string(),
            due_date: due_date.to_string(),
            ..CreateTaskRequest::default()
        };

        let draft = request.into_draft().unwrap();

        assert_eq!(draft.due_date.is_some(), !due_date.is_empty());
    }

    #[rstest]
    fn test_update_request_rejects_bad_due_date() {
        let request = UpdateTaskRequest {
            id: 1,
            title: "A".to_string(),
            due_date: "next week".to_string(),
            ..UpdateTaskRequest::default()
        };
        assert!(request.into_draft().is_err());
    }

    #[rstest]
    fn test_task_without_due_date_encodes_empty_string() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 9, 30, 0).unwrap();
        let task = domain::Task::create(TaskId::new(7), UserId::generate(), TaskDraft::new("A"), now);

        let message = Task::from(&task);

        assert_eq!(message.id, 7);
        assert_eq!(message.due_date, "");
        assert_eq!(message.created_at, "2030-01-01T09:30:00Z");
    }

    #[rstest]
    fn test_wire_field_numbers() {
        // Field 1 varint 5, field 2 length-delimited "A".
        let bytes = [0x08, 0x05, 0x12, 0x01, b'A'];
        let decoded = UpdateTaskRequest::decode(&bytes[..]).unwrap();
        assert_eq!(decoded.id, 5);
        assert_eq!(decoded.title, "A");
    }
}
