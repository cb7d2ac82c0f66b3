//! Shared fixtures for the integration tests.
//!
//! Builds the real routers over in-memory storage and a static credential
//! verifier with three identities:
//!
//! - alice: bearer token `alice-token`, registered
//! - bob: session cookie `bob-session`, registered
//! - carol: bearer token `carol-token`, verified but never registered

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use taskmanager::api::{AppState, WebhookState, health_router, http_router};
use taskmanager::auth::{PrincipalResolver, ProvisioningPolicy, StaticCredentialVerifier};
use taskmanager::context::RequestContext;
use taskmanager::domain::ExternalId;
use taskmanager::infrastructure::{
    InMemoryStore, InMemoryTaskRepository, InMemoryUserRepository, UserRepository,
};
use taskmanager::grpc::grpc_router;
use taskmanager::rpc::rpc_router;
use taskmanager::service::{TaskManager, TaskService};
use taskmanager::telemetry::HttpMetrics;

pub const COOKIE_NAME: &str = "ory_kratos_session";
pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_SESSION: &str = "bob-session";
pub const CAROL_TOKEN: &str = "carol-token";
pub const WEBHOOK_TOKEN: &str = "hook-secret";

/// How a test request authenticates.
#[derive(Debug, Clone, Copy)]
pub enum Caller {
    Anonymous,
    Alice,
    Bob,
    Carol,
    Bearer(&'static str),
}

impl Caller {
    fn apply(self, builder: axum::http::request::Builder) -> axum::http::request::Builder {
        match self {
            Self::Anonymous => builder,
            Self::Alice => builder.header(header::AUTHORIZATION, format!("Bearer {ALICE_TOKEN}")),
            Self::Bob => builder.header(header::COOKIE, format!("{COOKIE_NAME}={BOB_SESSION}")),
            Self::Carol => builder.header(header::AUTHORIZATION, format!("Bearer {CAROL_TOKEN}")),
            Self::Bearer(value) => builder.header(header::AUTHORIZATION, value),
        }
    }
}

pub struct TestApp {
    pub http: Router,
    pub rpc: Router,
    pub grpc: Router,
    pub health: Router,
    pub tasks: InMemoryTaskRepository,
    pub users: InMemoryUserRepository,
    pub metrics: HttpMetrics,
}

fn external_id(value: &str) -> ExternalId {
    ExternalId::parse(value).expect("non-blank identity")
}

/// Builds the routers with `policy` and registers alice and bob.
pub async fn spawn_app_with(policy: ProvisioningPolicy, webhook_token: Option<&str>) -> TestApp {
    build_app(policy, webhook_token, Duration::from_secs(5)).await
}

/// Builds the default routers with every request limited to `timeout`.
pub async fn spawn_app_with_timeout(timeout: Duration) -> TestApp {
    build_app(ProvisioningPolicy::RequireRegistration, None, timeout).await
}

async fn build_app(
    policy: ProvisioningPolicy,
    webhook_token: Option<&str>,
    timeout: Duration,
) -> TestApp {
    let store = InMemoryStore::new();
    let tasks = InMemoryTaskRepository::with_store(store.clone());
    let users = InMemoryUserRepository::with_store(store);

    let context = RequestContext::new();
    for registered in ["alice", "bob"] {
        users
            .materialize(&context, &external_id(registered))
            .await
            .expect("register user");
    }

    let verifier = StaticCredentialVerifier::new()
        .with_token(ALICE_TOKEN, external_id("alice"), &["tasks.read", "tasks.write"])
        .with_cookie(format!("{COOKIE_NAME}={BOB_SESSION}"), external_id("bob"))
        .with_token(CAROL_TOKEN, external_id("carol"), &[]);

    let resolver = Arc::new(PrincipalResolver::new(
        Arc::new(verifier),
        Arc::new(users.clone()),
        COOKIE_NAME,
        policy,
    ));
    let service: Arc<dyn TaskService> = Arc::new(TaskManager::new(
        Arc::new(tasks.clone()),
        Arc::new(users.clone()),
    ));
    let metrics = HttpMetrics::new().expect("metrics registry");

    let state = AppState::new(Arc::clone(&service), resolver, timeout);
    let webhook = WebhookState::new(service, webhook_token.map(str::to_string), timeout);

    TestApp {
        http: http_router(state.clone(), webhook, metrics.clone()),
        rpc: rpc_router(state.clone(), metrics.clone()),
        grpc: grpc_router(state, metrics.clone()),
        health: health_router(metrics.clone()),
        tasks,
        users,
        metrics,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(ProvisioningPolicy::RequireRegistration, None).await
}

/// Builds a request with an optional JSON body.
pub fn request(method: Method, uri: &str, caller: Caller, body: Option<Value>) -> Request<Body> {
    let builder = caller.apply(Request::builder().method(method).uri(uri));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

/// Sends `request` and returns the status and the body parsed as JSON
/// (`Value::Null` for an empty body, a JSON string for plain text).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Raw response body as text.
pub async fn send_text(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
