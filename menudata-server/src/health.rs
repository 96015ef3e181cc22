//! Health aggregation - pool presence plus credential presence
//!
//! Recomputed on every call from the live `AppState`; never fails.

use axum::http::StatusCode;
use menudata_core::CredentialPresence;
use serde::Serialize;

use crate::state::AppState;

/// Overall outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Per-dependency detail, reported regardless of outcome
#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub database: bool,
    #[serde(flatten)]
    pub credentials: CredentialPresence,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub details: HealthDetails,
}

impl HealthReport {
    pub fn from_parts(database: bool, credentials: CredentialPresence) -> Self {
        let healthy = database && credentials.all_present();
        Self {
            status: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            version: env!("CARGO_PKG_VERSION"),
            details: HealthDetails {
                database,
                credentials,
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// 200 when healthy, 503 otherwise
    pub fn status_code(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Snapshot the current state.
pub fn check(state: &AppState) -> HealthReport {
    HealthReport::from_parts(state.database.is_available(), state.credentials)
}
