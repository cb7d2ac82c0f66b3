//! Task manager server.
//!
//! Serves four listeners until SIGINT or SIGTERM:
//!
//! - `HTTP_PORT`: JSON task API and the identity webhook
//! - `GRPC_PORT`: `taskmanager.v1.TaskManager` over gRPC
//! - `RPC_PORT`: `taskmanager.v1.TaskManager` as JSON over HTTP
//! - `HEALTH_PORT`: `/healthz` and `/metrics`
//!
//! Configuration comes from an optional YAML file at `CONFIG_PATH`,
//! overridden by environment variables (a `.env` file is loaded first).
//! `RUST_LOG` controls log filtering and `LOG_FORMAT=json` switches to JSON
//! lines.

use std::sync::Arc;

use anyhow::Context;

use taskmanager::api::{AppState, WebhookState, health_router, http_router};
use taskmanager::auth::{OryCredentialVerifier, PrincipalResolver};
use taskmanager::config::AppConfig;
use taskmanager::grpc::grpc_router;
use taskmanager::infrastructure::RepositoryFactory;
use taskmanager::rpc::rpc_router;
use taskmanager::server::{BoundListener, ShutdownCoordinator, shutdown_signal};
use taskmanager::service::{TaskManager, TaskService};
use taskmanager::telemetry::{HttpMetrics, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development.
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);

    if let Err(error) = dotenv
        && !error.not_found()
    {
        tracing::warn!(%error, "Failed to load .env file");
    }

    tracing::info!(
        storage_mode = ?config.storage.mode,
        provisioning = ?config.auth.provisioning,
        "Starting task manager"
    );

    let repositories = RepositoryFactory::new(config.storage.clone())
        .create()
        .await
        .context("failed to initialize repositories")?;
    tracing::info!("Repositories initialized");

    let verifier = OryCredentialVerifier::new(
        &config.auth.kratos_public_url,
        &config.auth.hydra_admin_url,
        config.auth.timeout(),
    )
    .context("failed to build identity provider client")?;

    let resolver = Arc::new(PrincipalResolver::new(
        Arc::new(verifier),
        Arc::clone(&repositories.user_repository),
        config.auth.session_cookie_name.clone(),
        config.auth.provisioning,
    ));
    let service: Arc<dyn TaskService> = Arc::new(TaskManager::new(
        Arc::clone(&repositories.task_repository),
        Arc::clone(&repositories.user_repository),
    ));
    let metrics = HttpMetrics::new().context("failed to register metrics")?;

    let request_timeout = config.server.request_timeout();
    let state = AppState::new(Arc::clone(&service), resolver, request_timeout);
    let webhook = WebhookState::new(service, config.auth.webhook_token.clone(), request_timeout);
    if webhook.token.is_none() {
        tracing::warn!("WEBHOOK_TOKEN is not set; the identity webhook accepts unauthenticated calls");
    }

    let host = config.server.host.as_str();
    let listeners = vec![
        BoundListener::bind(
            "http",
            host,
            config.server.http_port,
            http_router(state.clone(), webhook, metrics.clone()),
        )
        .await?,
        BoundListener::bind(
            "grpc",
            host,
            config.server.grpc_port,
            grpc_router(state.clone(), metrics.clone()),
        )
        .await?,
        BoundListener::bind(
            "rpc",
            host,
            config.server.rpc_port,
            rpc_router(state, metrics.clone()),
        )
        .await?,
        BoundListener::bind(
            "health",
            host,
            config.server.health_port,
            health_router(metrics),
        )
        .await?,
    ];

    let coordinator = ShutdownCoordinator::new(config.server.shutdown_grace());
    let report = coordinator
        .run(listeners, shutdown_signal(), async {
            repositories.close().await;
            tracing::info!("Storage released");
        })
        .await;

    if report.is_clean() {
        tracing::info!("Server shutdown complete");
    } else {
        tracing::warn!(
            timed_out = ?report.timed_out,
            failed = ?report.failed,
            "Server shutdown complete with unfinished listeners"
        );
    }
    Ok(())
}
