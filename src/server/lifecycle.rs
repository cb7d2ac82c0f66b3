//! Listener lifecycle and graceful shutdown.
//!
//! ```text
//! Starting ──run()──▶ Serving ──signal/trigger──▶ Draining ──drained──▶ Stopped
//! ```
//!
//! Every listener stops accepting at the same moment and gets the same grace
//! deadline to finish in-flight requests. When a listener is still busy at the
//! deadline, its in-flight handlers are cut short with `503` and their futures
//! dropped, which cancels their request contexts. The listener then gets
//! [`ABORT_WINDOW`] to flush those responses and close its connections before
//! its serve task is aborted. The other listeners are unaffected. Storage is
//! released only after this.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::ServerError;

/// Time an overrunning listener gets to close its connections after its
/// handlers were cut short.
pub const ABORT_WINDOW: Duration = Duration::from_secs(1);

// =============================================================================
// Lifecycle State
// =============================================================================

/// Observable server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Listeners bound, not yet serving.
    Starting,
    /// Accepting requests.
    Serving,
    /// No longer accepting; in-flight requests are finishing.
    Draining,
    /// Every listener finished or was aborted and resources were released.
    Stopped,
}

// =============================================================================
// Bound Listener
// =============================================================================

/// A named socket together with the router it serves.
#[derive(Debug)]
pub struct BoundListener {
    name: &'static str,
    listener: TcpListener,
    router: Router,
}

impl BoundListener {
    /// Binds `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound.
    pub async fn bind(
        name: &'static str,
        host: &str,
        port: u16,
        router: Router,
    ) -> Result<Self, ServerError> {
        let address = format!("{host}:{port}");
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                listener: name,
                address,
                source,
            })?;
        Ok(Self::from_listener(name, listener, router))
    }

    /// Wraps an already bound socket.
    #[must_use]
    pub const fn from_listener(name: &'static str, listener: TcpListener, router: Router) -> Self {
        Self {
            name,
            listener,
            router,
        }
    }

    /// # Errors
    ///
    /// Returns `ServerError::LocalAddress` if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|source| ServerError::LocalAddress {
                listener: self.name,
                source,
            })
    }
}

// =============================================================================
// Drain Report
// =============================================================================

/// How each listener ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Finished every in-flight request within the grace period.
    pub drained: Vec<&'static str>,
    /// Exceeded the grace period; their in-flight handlers were cut short.
    pub timed_out: Vec<&'static str>,
    /// Stopped with an I/O error or panicked.
    pub failed: Vec<&'static str>,
}

impl DrainReport {
    /// True when every listener drained cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.timed_out.is_empty() && self.failed.is_empty()
    }
}

// =============================================================================
// Shutdown Coordinator
// =============================================================================

/// Serves listeners until shutdown and drains them within a grace period.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: watch::Sender<LifecycleState>,
    token: CancellationToken,
    grace: Duration,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            state: watch::Sender::new(LifecycleState::Starting),
            token: CancellationToken::new(),
            grace,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Starts draining as if a shutdown signal had arrived.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Serves `listeners` until `signal` completes or [`Self::trigger`] is
    /// called, then drains them and awaits `release` before reporting
    /// `Stopped`.
    pub async fn run<F, R>(&self, listeners: Vec<BoundListener>, signal: F, release: R) -> DrainReport
    where
        F: Future<Output = ()> + Send,
        R: Future<Output = ()> + Send,
    {
        let mut running = Vec::with_capacity(listeners.len());
        for BoundListener {
            name,
            listener,
            router,
        } in listeners
        {
            match listener.local_addr() {
                Ok(address) => tracing::info!(listener = name, %address, "Listening"),
                Err(error) => tracing::warn!(listener = name, %error, "Listening on unknown address"),
            }

            let abort = CancellationToken::new();
            let router =
                router.layer(middleware::from_fn_with_state(abort.clone(), cut_short_on_abort));
            let token = self.token.clone();
            let handle = tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await
            });
            running.push((name, handle, abort));
        }
        self.transition(LifecycleState::Serving);

        tokio::select! {
            () = signal => {}
            () = self.token.cancelled() => {}
        }
        self.token.cancel();
        self.transition(LifecycleState::Draining);

        let deadline = Instant::now() + self.grace;
        let mut report = DrainReport::default();
        for (name, mut handle, abort) in running {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(()))) => {
                    tracing::info!(listener = name, "Listener drained");
                    report.drained.push(name);
                }
                Ok(Ok(Err(error))) => {
                    tracing::error!(listener = name, %error, "Listener failed");
                    report.failed.push(name);
                }
                Ok(Err(error)) => {
                    tracing::error!(listener = name, %error, "Listener task panicked");
                    report.failed.push(name);
                }
                Err(_) => {
                    tracing::warn!(
                        listener = name,
                        grace = ?self.grace,
                        "Listener exceeded shutdown grace period, cutting in-flight requests short"
                    );
                    abort.cancel();
                    if tokio::time::timeout(ABORT_WINDOW, &mut handle).await.is_err() {
                        tracing::error!(listener = name, "Listener did not close its connections, aborting");
                        handle.abort();
                    }
                    report.timed_out.push(name);
                }
            }
        }

        release.await;
        self.transition(LifecycleState::Stopped);
        report
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::info!(from = ?previous, to = ?next, "Lifecycle state changed");
    }
}

/// Races each request against its listener's abort token.
async fn cut_short_on_abort(
    State(abort): State<CancellationToken>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        () = abort.cancelled() => {
            (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response()
        }
    }
}
