//! HTTP surface.
//!
//! JSON task CRUD under `/tasks`, the identity webhook, and the health and
//! metrics endpoints served on their own listener.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod health;
pub mod routes;
pub mod state;
pub mod webhook;

pub use dto::{TaskRequest, TaskResponse};
pub use error::{ApiError, ApiErrorResponse, FieldError};
pub use extract::{Authenticated, attach_request_context};
pub use handlers::{create_task, delete_task, get_task, list_tasks, update_task};
pub use health::{health_check, metrics};
pub use routes::{health_router, http_router, webhook_router};
pub use state::{AppState, RequestTimeout, WebhookState};
pub use webhook::{IdentityCreated, identity_created};
