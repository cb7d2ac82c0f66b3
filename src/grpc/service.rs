//! `taskmanager.v1.TaskManager` over gRPC.

use tonic::{Request, Response, Status};

use super::proto::task_manager_server::{TaskManager, TaskManagerServer};
use super::proto::{
    CreateTaskRequest, DeleteTaskRequest, DeleteTaskResponse, GetTaskRequest, ListTasksRequest,
    ListTasksResponse, Task, UpdateTaskRequest,
};
use crate::api::AppState;
use crate::context::RequestContext;
use crate::domain::{Principal, TaskId};
use crate::service::ServiceError;

/// gRPC front of the task service.
///
/// Credentials are read from the `authorization` and `cookie` metadata and
/// resolved by the same resolver the HTTP surfaces use.
#[derive(Debug, Clone)]
pub struct GrpcTaskManager {
    state: AppState,
}

impl GrpcTaskManager {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn into_server(self) -> TaskManagerServer<Self> {
        TaskManagerServer::new(self)
    }

    #[allow(clippy::result_large_err)]
    async fn authorize<T>(&self, request: &Request<T>) -> Result<(RequestContext, Principal), Status> {
        let context = request
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default();
        let headers = request.metadata().clone().into_headers();

        let principal = self
            .state
            .resolver
            .resolve_headers(&context, &headers)
            .await
            .map_err(|error| {
                tracing::debug!(%error, "Call not authenticated");
                Status::from(ServiceError::from(error))
            })?;
        Ok((context, principal))
    }
}

#[tonic::async_trait]
impl TaskManager for GrpcTaskManager {
    async fn create_task(
        &self,
        request: Request<CreateTaskRequest>,
    ) -> Result<Response<Task>, Status> {
        let (context, principal) = self.authorize(&request).await?;
        let draft = request
            .into_inner()
            .into_draft()
            .map_err(ServiceError::from)?;

        let task = self
            .state
            .service
            .create_task(&context, &principal, draft)
            .await?;
        Ok(Response::new(Task::from(&task)))
    }

    async fn get_task(&self, request: Request<GetTaskRequest>) -> Result<Response<Task>, Status> {
        let (context, principal) = self.authorize(&request).await?;
        let id = TaskId::new(request.into_inner().id);

        let task = self.state.service.get_task(&context, &principal, id).await?;
        Ok(Response::new(Task::from(&task)))
    }

    async fn update_task(
        &self,
        request: Request<UpdateTaskRequest>,
    ) -> Result<Response<Task>, Status> {
        let (context, principal) = self.authorize(&request).await?;
        let message = request.into_inner();
        let id = TaskId::new(message.id);
        let draft = message.into_draft().map_err(ServiceError::from)?;

        let task = self
            .state
            .service
            .update_task(&context, &principal, id, draft)
            .await?;
        Ok(Response::new(Task::from(&task)))
    }

    async fn delete_task(
        &self,
        request: Request<DeleteTaskRequest>,
    ) -> Result<Response<DeleteTaskResponse>, Status> {
        let (context, principal) = self.authorize(&request).await?;
        let id = TaskId::new(request.into_inner().id);

        self.state
            .service
            .delete_task(&context, &principal, id)
            .await?;
        Ok(Response::new(DeleteTaskResponse {}))
    }

    async fn list_tasks(
        &self,
        request: Request<ListTasksRequest>,
    ) -> Result<Response<ListTasksResponse>, Status> {
        let (context, principal) = self.authorize(&request).await?;

        let tasks = self.state.service.list_tasks(&context, &principal).await?;
        Ok(Response::new(ListTasksResponse {
            tasks: tasks.iter().map(Task::from).collect(),
        }))
    }
}
