//! menudata-server: HTTP service over the menu objects table
//!
//! Serves filtered rows from a single MySQL table behind a static API key,
//! plus an unauthenticated health probe.

pub mod db;
pub mod health;
pub mod http;
pub mod state;

pub use db::{BootstrapError, DatabaseTarget, PoolManager, PoolSettings};
pub use health::{HealthReport, HealthStatus};
pub use http::{build_router, run_server, ServerConfig, ServerError};
pub use state::AppState;
