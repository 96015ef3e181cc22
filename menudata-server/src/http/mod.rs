//! HTTP server layer
//!
//! Axum server with:
//! - API key gate on the objects collection
//! - Unauthenticated health probe
//! - Request tracing and permissive CORS
//! - Graceful shutdown
//! - JSON error responses

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

pub use auth::{ApiKeyGate, AuthError};
pub use error::ApiError;
pub use server::{build_router, run_server, ServerConfig, ServerError};
