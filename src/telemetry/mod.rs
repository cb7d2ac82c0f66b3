//! Logging and metrics.
//!
//! [`init_tracing`] installs the global subscriber. [`HttpMetrics`] records
//! request counts and latencies for the `/metrics` endpoint.

pub mod metrics;

use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ConfigurationError;

pub use metrics::{HttpMetrics, MetricsError, track_metrics};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "taskmanager=debug,tower_http=debug";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigurationError::InvalidValue {
                key: "LOG_FORMAT",
                value: value.to_string(),
                reason: "expected 'pretty' or 'json'".to_string(),
            }),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
