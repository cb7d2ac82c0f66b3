//! Generates the `taskmanager.v1.TaskManager` server and client stubs.
//!
//! Message types live in `src/grpc/proto.rs`; only the service plumbing is
//! generated here, so building does not need `protoc`.

use tonic_build::manual::{Builder, Method, Service};

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::grpc::proto::{input}"))
        .output_type(format!("crate::grpc::proto::{output}"))
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let service = Service::builder()
        .name("TaskManager")
        .package("taskmanager.v1")
        .method(unary("create_task", "CreateTask", "CreateTaskRequest", "Task"))
        .method(unary("get_task", "GetTask", "GetTaskRequest", "Task"))
        .method(unary("update_task", "UpdateTask", "UpdateTaskRequest", "Task"))
        .method(unary(
            "delete_task",
            "DeleteTask",
            "DeleteTaskRequest",
            "DeleteTaskResponse",
        ))
        .method(unary(
            "list_tasks",
            "ListTasks",
            "ListTasksRequest",
            "ListTasksResponse",
        ))
        .build();

    Builder::new().compile(&[service]);
}
