//! Walks a task through its lifecycle against a running server over gRPC.
//!
//! - `TASKMANAGER_GRPC_URL`: server address (default: `http://127.0.0.1:50051`)
//! - `TASKMANAGER_TOKEN`: bearer token sent with every call

use std::time::Duration;

use anyhow::Context;
use chrono::{TimeDelta, Utc};
use tonic::Request;
use tonic::metadata::{Ascii, MetadataValue};

use taskmanager::domain::format_timestamp;
use taskmanager::grpc::proto::task_manager_client::TaskManagerClient;
use taskmanager::grpc::proto::{
    CreateTaskRequest, DeleteTaskRequest, GetTaskRequest, ListTasksRequest, UpdateTaskRequest,
};

const DEFAULT_URL: &str = "http://127.0.0.1:50051";
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

fn authorized<T>(message: T, authorization: &MetadataValue<Ascii>) -> Request<T> {
    let mut request = Request::new(message);
    request
        .metadata_mut()
        .insert("authorization", authorization.clone());
    request.set_timeout(CALL_TIMEOUT);
    request
}

fn due_in(hours: i64) -> String {
    format_timestamp(&(Utc::now() + TimeDelta::hours(hours)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let url = std::env::var("TASKMANAGER_GRPC_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let token = std::env::var("TASKMANAGER_TOKEN").context("TASKMANAGER_TOKEN must be set")?;
    let authorization: MetadataValue<Ascii> = format!("Bearer {token}")
        .parse()
        .context("token is not valid metadata")?;

    let mut client = TaskManagerClient::connect(url.clone())
        .await
        .with_context(|| format!("could not connect to {url}"))?;

    let created = client
        .create_task(authorized(
            CreateTaskRequest {
                title: "My first task".to_string(),
                description: "Created by taskmanager-client".to_string(),
                due_date: due_in(24),
                completed: false,
            },
            &authorization,
        ))
        .await
        .context("could not create task")?
        .into_inner();
    println!("Created task: {created:?}");

    let fetched = client
        .get_task(authorized(GetTaskRequest { id: created.id }, &authorization))
        .await
        .context("could not get task")?
        .into_inner();
    println!("Got task: {fetched:?}");

    let updated = client
        .update_task(authorized(
            UpdateTaskRequest {
                id: created.id,
                title: "Updated task title".to_string(),
                description: "Updated description".to_string(),
                due_date: due_in(48),
                completed: true,
            },
            &authorization,
        ))
        .await
        .context("could not update task")?
        .into_inner();
    println!("Updated task: {updated:?}");

    let listed = client
        .list_tasks(authorized(ListTasksRequest {}, &authorization))
        .await
        .context("could not list tasks")?
        .into_inner();
    println!("Tasks: {:?}", listed.tasks);

    client
        .delete_task(authorized(DeleteTaskRequest { id: created.id }, &authorization))
        .await
        .context("could not delete task")?;
    println!("Deleted task {}", created.id);

    let listed = client
        .list_tasks(authorized(ListTasksRequest {}, &authorization))
        .await
        .context("could not list tasks")?
        .into_inner();
    println!("Tasks after delete: {:?}", listed.tasks);

    Ok(())
}
