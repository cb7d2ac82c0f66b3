//! Task tracking backend.
//!
//! Tasks are owned by users and every read or write is scoped to the
//! authenticated principal. The same [`service::TaskService`] is reachable
//! over gRPC, a JSON RPC surface and an HTTP surface, with a separate
//! listener for health and metrics.
//!
//! Layering, leaf first:
//!
//! - [`domain`]: users, tasks, principals and their identifiers
//! - [`infrastructure`]: transactional repositories (`PostgreSQL`, in-memory)
//! - [`auth`]: credential classification, verification and principal resolution
//! - [`service`]: ownership-scoped task operations and error translation
//! - [`api`], [`rpc`] and [`grpc`]: the transports
//! - [`server`]: listener lifecycle and graceful shutdown

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod domain;
pub mod grpc;
pub mod infrastructure;
pub mod rpc;
pub mod server;
pub mod service;
pub mod telemetry;
