//! Listener management and graceful shutdown.

pub mod lifecycle;
pub mod signal;

use thiserror::Error;

pub use lifecycle::{BoundListener, DrainReport, LifecycleState, ShutdownCoordinator};
pub use signal::shutdown_signal;

/// Errors raised while setting up listeners.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{listener} listener failed to bind {address}: {source}")]
    Bind {
        listener: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{listener} listener has no local address: {source}")]
    LocalAddress {
        listener: &'static str,
        #[source]
        source: std::io::Error,
    },
}
