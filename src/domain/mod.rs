//! Domain model.
//!
//! Plain data types shared by every layer: users and their external
//! identities, tasks and the client-controlled part of a task, and the
//! principal a request acts on behalf of.

pub mod principal;
pub mod task;
pub mod user;

pub use principal::Principal;
pub use task::{
    DraftError, DueDateError, InvalidTaskId, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH, Task,
    TaskDraft, TaskId, format_timestamp, parse_due_date,
};
pub use user::{ExternalId, User, UserId};
