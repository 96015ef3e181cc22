//! Axum server setup
//!
//! - Permissive CORS (browser clients on any origin)
//! - Request tracing that records method and path only, never the query string
//! - Graceful shutdown on SIGTERM/Ctrl+C, closing the pool afterwards

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// Build the full router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    // The api_key query parameter must not end up in span fields
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    });

    Router::new()
        .merge(routes::health::router())
        .merge(routes::objects::router(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(trace)
        .with_state(state)
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let database = PoolManager::bootstrap(&credentials, &PoolSettings::default()).await;
/// let state = Arc::new(AppState::new(database, &credentials, &table));
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: Arc<AppState>, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state.clone());

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        database = state.database.is_available(),
        "server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.database.close().await;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use menudata_core::{CredentialField, Credentials, QueryStatement, TableName};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::db::{BootstrapError, DbError, MemorySource, PoolManager, Record, RecordSource};

    const KEY: &str = "test-key";

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn rows() -> Vec<Record> {
        vec![
            record(json!({"id": 1, "date": "2024-01-01", "meal_time": "lunch", "line_type": "grill"})),
            record(json!({"id": 2, "date": "2024-01-02", "meal_time": "lunch", "line_type": "grill"})),
            record(json!({"id": 3, "date": "2024-01-01", "meal_time": "dinner", "line_type": "salad"})),
        ]
    }

    fn credentials() -> Credentials {
        Credentials::default()
            .with(CredentialField::ApiKey, KEY)
            .with(CredentialField::DbUser, "app")
            .with(CredentialField::DbPassword, "secret")
            .with(CredentialField::DbName, "menus")
            .with(CredentialField::ConnectionName, "proj:region:inst")
    }

    fn table() -> TableName {
        TableName::new("objects").unwrap()
    }

    fn app_with(database: PoolManager, credentials: &Credentials) -> Router {
        build_router(Arc::new(AppState::new(database, credentials, &table())))
    }

    fn memory_app(source: Arc<MemorySource>) -> Router {
        app_with(PoolManager::from_source(source), &credentials())
    }

    fn unavailable() -> PoolManager {
        PoolManager::unavailable(BootstrapError::MissingCredentials {
            fields: vec![CredentialField::DbPassword],
        })
    }

    fn get(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    struct FailingSource;

    #[async_trait]
    impl RecordSource for FailingSource {
        async fn fetch(&self, _statement: &QueryStatement) -> Result<Vec<Record>, DbError> {
            Err(DbError::Sqlx(sqlx::Error::Protocol(
                "Table 'menus.objects' doesn't exist".into(),
            )))
        }
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[tokio::test]
    async fn objects_without_key_is_401() {
        let source = Arc::new(MemorySource::new(rows()));
        let (status, body) = send(memory_app(source.clone()), get("/api/objects", None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Invalid or missing API key"}));
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn objects_with_wrong_key_is_401() {
        let source = Arc::new(MemorySource::new(rows()));
        let (status, _) = send(memory_app(source.clone()), get("/api/objects", Some("nope"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn unconfigured_key_rejects_even_empty_presentation() {
        let mut creds = credentials();
        creds.set(CredentialField::ApiKey, "");
        let app = app_with(PoolManager::from_source(Arc::new(MemorySource::new(rows()))), &creds);

        let (status, _) = send(app, get("/api/objects?api_key=", Some(""))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unfiltered_returns_table_order() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(app, get("/api/objects", Some(KEY))).await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn date_filter_via_query_key() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(app, get("/api/objects?date=2024-01-01&api_key=test-key", None)).await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn combined_filters_and_unknown_params() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(
            app,
            get("/api/objects?date=2024-01-01&meal_time=dinner&page=2", Some(KEY)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"date": "2024-01-01", "id": 3, "line_type": "salad", "meal_time": "dinner"}])
        );
    }

    #[tokio::test]
    async fn repeated_filter_key_uses_first_value() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(
            app,
            get("/api/objects?date=2024-01-01&date=2024-01-02", Some(KEY)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn empty_filter_value_is_ignored() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(app, get("/api/objects?date=", Some(KEY))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn no_match_is_empty_array() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(app, get("/api/objects?line_type=soup", Some(KEY))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn objects_without_pool_is_503() {
        let app = app_with(unavailable(), &credentials());
        let (status, body) = send(app, get("/api/objects", Some(KEY))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Database connection not available"}));
    }

    #[tokio::test]
    async fn query_failure_is_generic_500() {
        let app = app_with(PoolManager::from_source(Arc::new(FailingSource)), &credentials());
        let (status, body) = send(app, get("/api/objects", Some(KEY))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn health_is_open_and_healthy() {
        let app = memory_app(Arc::new(MemorySource::new(rows())));
        let (status, body) = send(app, get("/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["details"]["database"], json!(true));
        assert_eq!(body["details"]["api_key"], json!(true));
    }

    #[tokio::test]
    async fn health_without_pool_is_503() {
        let mut creds = credentials();
        creds.set(CredentialField::DbPassword, "");
        let app = app_with(unavailable(), &creds);
        let (status, body) = send(app, get("/health", None)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("unhealthy"));
        assert_eq!(body["details"]["database"], json!(false));
        assert_eq!(body["details"]["db_password"], json!(false));
        assert_eq!(body["details"]["db_user"], json!(true));
    }
}
