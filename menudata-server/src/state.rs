//! Application state shared across handlers

use menudata_core::{CredentialPresence, Credentials, QueryBuilder, TableName};

use crate::db::PoolManager;
use crate::http::auth::ApiKeyGate;

/// Shared application state, built once at startup and wrapped in `Arc`
pub struct AppState {
    pub database: PoolManager,
    pub gate: ApiKeyGate,
    pub queries: QueryBuilder,
    /// Which credentials were resolved at startup
    pub credentials: CredentialPresence,
}

impl AppState {
    pub fn new(database: PoolManager, credentials: &Credentials, table: &TableName) -> Self {
        Self {
            database,
            gate: ApiKeyGate::new(credentials.api_key().map(str::to_owned)),
            queries: QueryBuilder::new(table),
            credentials: credentials.presence(),
        }
    }
}
