//! Task domain model.
//!
//! A [`Task`] always belongs to exactly one user. The client controls only the
//! fields in [`TaskDraft`]; identifiers, ownership and timestamps are assigned
//! by the server.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserId;

/// Maximum title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Sequence-generated task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(i32);

impl TaskId {
    /// Creates a `TaskId` from a raw sequence value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Error returned when a task id cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid task id: '{0}'")]
pub struct InvalidTaskId(pub String);

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .parse::<i32>()
            .map(Self)
            .map_err(|_| InvalidTaskId(value.to_string()))
    }
}

// =============================================================================
// Due Dates
// =============================================================================

/// Error returned when a due date is not a valid RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid due date '{value}': {reason}")]
pub struct DueDateError {
    /// The rejected input.
    pub value: String,
    /// Parser message.
    pub reason: String,
}

/// Parses a wire-level due date.
///
/// An empty string means "no due date" and is never handed to the parser.
///
/// # Errors
///
/// Returns `DueDateError` when a non-empty value is not RFC 3339.
pub fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>, DueDateError> {
    if raw.is_empty() {
        return Ok(None);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| Some(parsed.with_timezone(&Utc)))
        .map_err(|error| DueDateError {
            value: raw.to_string(),
            reason: error.to_string(),
        })
}

/// Formats a timestamp as RFC 3339 in UTC with a `Z` suffix.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// =============================================================================
// Task Draft
// =============================================================================

/// Validation failures for a [`TaskDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// Title is empty or whitespace only.
    #[error("title must not be empty")]
    EmptyTitle,

    /// Title exceeds [`MAX_TITLE_LENGTH`].
    #[error("title must be at most {MAX_TITLE_LENGTH} characters, got {length}")]
    TitleTooLong { length: usize },

    /// Description exceeds [`MAX_DESCRIPTION_LENGTH`].
    #[error("description must be at most {MAX_DESCRIPTION_LENGTH} characters, got {length}")]
    DescriptionTooLong { length: usize },
}

impl DraftError {
    /// Name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle | Self::TitleTooLong { .. } => "title",
            Self::DescriptionTooLong { .. } => "description",
        }
    }
}

/// Client-controlled fields of a task, used as create and update input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Short summary.
    pub title: String,
    /// Free-form details, possibly empty.
    pub description: String,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
    /// Whether the task is done.
    pub completed: bool,
}

impl TaskDraft {
    /// Creates an open draft with no description or due date.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Checks the length limits on title and description.
    ///
    /// # Errors
    ///
    /// Returns the first `DraftError` found, title before description.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }

        let title_length = self.title.chars().count();
        if title_length > MAX_TITLE_LENGTH {
            return Err(DraftError::TitleTooLong {
                length: title_length,
            });
        }

        let description_length = self.description.chars().count();
        if description_length > MAX_DESCRIPTION_LENGTH {
            return Err(DraftError::DescriptionTooLong {
                length: description_length,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Task Entity
// =============================================================================

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Owning user. Never changes after creation.
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a freshly created task with both timestamps set to `now`.
    #[must_use]
    pub fn create(id: TaskId, owner_id: UserId, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id,
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            completed: draft.completed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the client-controlled fields and refreshes `updated_at`.
    ///
    /// Identity, owner and `created_at` are preserved.
    #[must_use]
    pub fn revise(self, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            completed: draft.completed,
            updated_at: now,
            ..self
        }
    }

    /// Returns the client-controlled fields of this task.
    #[must_use]
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            completed: self.completed,
        }
    }

    /// Returns true if `user_id` owns this task.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner_id == *user_id
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;

    fn fixed_time(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    // -------------------------------------------------------------------------
    // TaskId Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("1", 1)]
    #[case("2147483647", i32::MAX)]
    #[case("-4", -4)]
    fn test_task_id_from_str_valid(#[case] input: &str, #[case] expected: i32) {
        assert_eq!(input.parse::<TaskId>().unwrap(), TaskId::new(expected));
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    #[case("2147483648")]
    #[case("1.5")]
    fn test_task_id_from_str_invalid(#[case] input: &str) {
        let error = input.parse::<TaskId>().unwrap_err();
        assert_eq!(error, InvalidTaskId(input.to_string()));
    }

    // -------------------------------------------------------------------------
    // Due Date Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_parse_due_date_empty_means_none() {
        assert_eq!(parse_due_date("").unwrap(), None);
    }

    #[rstest]
    #[case("2025-01-01T00:00:00Z", fixed_time(0))]
    #[case("2025-01-01T09:00:00+09:00", fixed_time(0))]
    fn test_parse_due_date_normalizes_to_utc(#[case] input: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_due_date(input).unwrap(), Some(expected));
    }

    #[rstest]
    #[case("not-a-date")]
    #[case("2025-13-01T00:00:00Z")]
    #[case("2025-01-01")]
    #[case(" ")]
    fn test_parse_due_date_rejects_garbage(#[case] input: &str) {
        let error = parse_due_date(input).unwrap_err();
        assert_eq!(error.value, input);
    }

    #[rstest]
    fn test_format_timestamp_uses_z_suffix() {
        assert_eq!(format_timestamp(&fixed_time(0)), "2025-01-01T00:00:00Z");
    }

    proptest! {
        #[test]
        fn prop_formatted_timestamps_parse_back(seconds in 0_i64..4_102_444_800) {
            let timestamp = Utc.timestamp_opt(seconds, 0).unwrap();
            let parsed = parse_due_date(&format_timestamp(&timestamp)).unwrap();
            prop_assert_eq!(parsed, Some(timestamp));
        }

        #[test]
        fn prop_alphabetic_text_is_never_a_due_date(raw in "[a-zA-Z ]{1,32}") {
            prop_assert!(parse_due_date(&raw).is_err());
        }
    }

    // -------------------------------------------------------------------------
    // Draft Validation Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_validate_accepts_minimal_draft() {
        assert_eq!(TaskDraft::new("A").validate(), Ok(()));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_validate_rejects_blank_title(#[case] title: &str) {
        let error = TaskDraft::new(title).validate().unwrap_err();
        assert_eq!(error, DraftError::EmptyTitle);
        assert_eq!(error.field(), "title");
    }

    #[rstest]
    fn test_validate_counts_characters_not_bytes() {
        let title: String = "é".repeat(MAX_TITLE_LENGTH);
        assert_eq!(TaskDraft::new(title).validate(), Ok(()));
    }

    #[rstest]
    fn test_validate_rejects_long_title() {
        let title = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert_eq!(
            TaskDraft::new(title).validate(),
            Err(DraftError::TitleTooLong {
                length: MAX_TITLE_LENGTH + 1
            })
        );
    }

    #[rstest]
    fn test_validate_rejects_long_description() {
        let draft = TaskDraft {
            description: "x".repeat(MAX_DESCRIPTION_LENGTH + 1),
            ..TaskDraft::new("A")
        };
        let error = draft.validate().unwrap_err();
        assert_eq!(error.field(), "description");
    }

    // -------------------------------------------------------------------------
    // Task Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_create_sets_both_timestamps() {
        let task = Task::create(
            TaskId::new(1),
            UserId::generate(),
            TaskDraft::new("A"),
            fixed_time(1),
        );
        assert_eq!(task.created_at, fixed_time(1));
        assert_eq!(task.updated_at, fixed_time(1));
        assert!(!task.completed);
    }

    #[rstest]
    fn test_revise_preserves_identity_and_creation_time() {
        let owner = UserId::generate();
        let original = Task::create(TaskId::new(7), owner, TaskDraft::new("A"), fixed_time(1));
        let draft = TaskDraft {
            completed: true,
            due_date: Some(fixed_time(5)),
            ..TaskDraft::new("B")
        };

        let revised = original.revise(draft.clone(), fixed_time(2));

        assert_eq!(revised.id, TaskId::new(7));
        assert!(revised.is_owned_by(&owner));
        assert_eq!(revised.created_at, fixed_time(1));
        assert_eq!(revised.updated_at, fixed_time(2));
        assert_eq!(revised.draft(), draft);
    }
}
