//! Application configuration.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional YAML file named by `CONFIG_PATH`
//! 3. environment variables (a `.env` file is loaded by the binary first)
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
//! - `RUN_MIGRATIONS`: apply `migrations/` at startup (default: `false`)
//! - `HOST`: bind address for every listener (default: `0.0.0.0`)
//! - `HTTP_PORT` / `GRPC_PORT` / `RPC_PORT` / `HEALTH_PORT`: listener ports
//!   (default: `8080` / `50051` / `8081` / `9090`)
//! - `REQUEST_TIMEOUT_MS`: per-request deadline (default: `5000`)
//! - `SHUTDOWN_GRACE_MS`: drain period per listener (default: `10000`)
//! - `KRATOS_PUBLIC_URL`: session service base URL
//! - `HYDRA_ADMIN_URL`: token introspection base URL
//! - `SESSION_COOKIE_NAME`: session cookie (default: `ory_kratos_session`)
//! - `AUTH_TIMEOUT_MS`: identity provider call timeout (default: `3000`)
//! - `PROVISIONING_POLICY`: `require_registration` (default) | `provision_on_first_contact`
//! - `WEBHOOK_TOKEN`: shared secret expected on the registration webhook
//! - `LOG_FORMAT`: `pretty` (default) | `json`

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::ProvisioningPolicy;
use crate::telemetry::LogFormat;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Invalid storage mode value.
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    /// A value could not be parsed.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Missing `DATABASE_URL` when storage mode is Postgres.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path}: {reason}")]
    ReadFile { path: String, reason: String },

    /// The configuration file is not valid YAML for this schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseFile(String),
}

impl ConfigurationError {
    fn invalid(key: &'static str, value: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Storage mode for persistent data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// In-memory storage. Suitable for testing and development.
    #[default]
    InMemory,
    /// `PostgreSQL` storage for production use.
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ConfigurationError::InvalidStorageMode(value.to_string())),
        }
    }
}

/// Storage backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub mode: StorageMode,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::InMemory,
            database_url: None,
            max_connections: 10,
            run_migrations: false,
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// Listener and request lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
    pub rpc_port: u16,
    pub health_port: u16,
    pub request_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    /// Deadline applied to every request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Time each listener gets to drain in-flight requests.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            grpc_port: 50051,
            rpc_port: 8081,
            health_port: 9090,
            request_timeout_ms: 5_000,
            shutdown_grace_ms: 10_000,
        }
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub kratos_public_url: String,
    pub hydra_admin_url: String,
    pub session_cookie_name: String,
    pub timeout_ms: u64,
    pub provisioning: ProvisioningPolicy,
    pub webhook_token: Option<String>,
}

impl AuthConfig {
    /// Timeout for each identity provider call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            kratos_public_url: "http://127.0.0.1:4433".to_string(),
            hydra_admin_url: "http://127.0.0.1:4445".to_string(),
            session_cookie_name: "ory_kratos_session".to_string(),
            timeout_ms: 3_000,
            provisioning: ProvisioningPolicy::default(),
            webhook_token: None,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads configuration from `CONFIG_PATH` (if set) and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the file cannot be read or parsed, a
    /// variable has an invalid value, or validation fails.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let base = match lookup("CONFIG_PATH").filter(|path| !path.trim().is_empty()) {
            Some(path) => Self::from_yaml_file(Path::new(&path))?,
            None => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Reads a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ReadFile` or `ParseFile`.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| ConfigurationError::ReadFile {
                path: path.display().to_string(),
                reason: error.to_string(),
            })?;
        Self::from_yaml_str(&contents)
    }

    /// Parses YAML configuration. Missing sections and keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ParseFile` on malformed YAML or unknown keys.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(contents)
            .map_err(|error| ConfigurationError::ParseFile(error.to_string()))
    }

    /// Applies environment overrides read through `lookup`, then validates.
    ///
    /// Empty or whitespace-only values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for unparsable values or failed validation.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read("STORAGE_MODE") {
            self.storage.mode = value.parse()?;
        }
        if let Some(value) = read("DATABASE_URL") {
            self.storage.database_url = Some(value);
        }
        if let Some(value) = read("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = parse_number("DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read("RUN_MIGRATIONS") {
            self.storage.run_migrations = parse_flag("RUN_MIGRATIONS", &value)?;
        }

        if let Some(value) = read("HOST") {
            self.server.host = value;
        }
        if let Some(value) = read("HTTP_PORT") {
            self.server.http_port = parse_number("HTTP_PORT", &value)?;
        }
        if let Some(value) = read("GRPC_PORT") {
            self.server.grpc_port = parse_number("GRPC_PORT", &value)?;
        }
        if let Some(value) = read("RPC_PORT") {
            self.server.rpc_port = parse_number("RPC_PORT", &value)?;
        }
        if let Some(value) = read("HEALTH_PORT") {
            self.server.health_port = parse_number("HEALTH_PORT", &value)?;
        }
        if let Some(value) = read("REQUEST_TIMEOUT_MS") {
            self.server.request_timeout_ms = parse_number("REQUEST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read("SHUTDOWN_GRACE_MS") {
            self.server.shutdown_grace_ms = parse_number("SHUTDOWN_GRACE_MS", &value)?;
        }

        if let Some(value) = read("KRATOS_PUBLIC_URL") {
            self.auth.kratos_public_url = value;
        }
        if let Some(value) = read("HYDRA_ADMIN_URL") {
            self.auth.hydra_admin_url = value;
        }
        if let Some(value) = read("SESSION_COOKIE_NAME") {
            self.auth.session_cookie_name = value;
        }
        if let Some(value) = read("AUTH_TIMEOUT_MS") {
            self.auth.timeout_ms = parse_number("AUTH_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read("PROVISIONING_POLICY") {
            self.auth.provisioning = value.parse()?;
        }
        if let Some(value) = read("WEBHOOK_TOKEN") {
            self.auth.webhook_token = Some(value);
        }

        if let Some(value) = read("LOG_FORMAT") {
            self.log_format = value.parse()?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if:
    /// - `DATABASE_URL` is missing in `postgres` mode
    /// - a timeout is zero
    /// - the session cookie name is blank
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.storage.mode == StorageMode::Postgres && self.storage.database_url.is_none() {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigurationError::invalid(
                "REQUEST_TIMEOUT_MS",
                "0",
                "must be greater than zero",
            ));
        }
        if self.auth.timeout_ms == 0 {
            return Err(ConfigurationError::invalid(
                "AUTH_TIMEOUT_MS",
                "0",
                "must be greater than zero",
            ));
        }
        if self.auth.session_cookie_name.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "SESSION_COOKIE_NAME",
                &self.auth.session_cookie_name,
                "must not be blank",
            ));
        }
        Ok(())
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigurationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|error| ConfigurationError::invalid(key, value, error))
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigurationError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigurationError::invalid(key, value, "expected a boolean")),
    }
}

// =============================================================================
// Tests
// =============================================================================
