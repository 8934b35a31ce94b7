//! # Casting Server
//!
//! REST service for a casting agency's catalog of actors and movies. Every
//! route requires a bearer token carrying the route's permission, checked by
//! [`casting_auth`] before the handler runs.
//!
//! ## Modules
//!
//! - [`api`] - Routes, handlers and error responses
//! - [`app`] - Router assembly and shared state
//! - [`store`] - Storage trait and the in-memory implementation
//! - [`model`] - Records, request payloads and validation
//! - [`config`] - Server settings (file + `CASTING_` environment)
//! - [`logging`] - Tracing subscriber setup

pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod model;
pub mod store;

pub use app::{AppState, build_app};
pub use config::{ConfigError, LogFormat, ServerConfig};
pub use store::{CastingStore, MemoryStore, StoreError, StoreResult};
