//! Database connection pool bootstrap
//!
//! The pool is built at most once per process. Bootstrap fails fast: missing
//! credentials stop it before any network traffic, and a single direct
//! connection must answer `SELECT 1` before the pool is created. Nothing retries;
//! a failed bootstrap stays failed until the process restarts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use menudata_core::{CredentialField, Credentials};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPoolOptions};
use sqlx::{Connection, MySqlPool};

use super::records::RecordSource;

/// Base number of pooled connections
pub const DEFAULT_POOL_SIZE: u32 = 5;

/// Extra connections allowed above the base size under load
pub const DEFAULT_MAX_OVERFLOW: u32 = 2;

/// How long a request waits for a free connection
pub const DEFAULT_BORROW_TIMEOUT: Duration = Duration::from_secs(30);

/// Connections older than this are closed and replaced
pub const DEFAULT_RECYCLE_AGE: Duration = Duration::from_secs(1800);

/// Cloud SQL unix socket directory
pub const DEFAULT_SOCKET_DIR: &str = "/cloudsql";

/// Default MySQL TCP port
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Where the pool connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// `{dir}/{connection_name}` unix socket (Cloud SQL)
    UnixSocket { dir: PathBuf },
    /// Plain TCP, for local development
    Tcp { host: String, port: u16 },
}

impl Default for DatabaseTarget {
    fn default() -> Self {
        Self::UnixSocket {
            dir: PathBuf::from(DEFAULT_SOCKET_DIR),
        }
    }
}

/// Pool sizing policy and target
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub borrow_timeout: Duration,
    pub recycle_age: Duration,
    pub target: DatabaseTarget,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            max_overflow: DEFAULT_MAX_OVERFLOW,
            borrow_timeout: DEFAULT_BORROW_TIMEOUT,
            recycle_age: DEFAULT_RECYCLE_AGE,
            target: DatabaseTarget::default(),
        }
    }
}

impl PoolSettings {
    pub fn with_target(mut self, target: DatabaseTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_borrow_timeout(mut self, timeout: Duration) -> Self {
        self.borrow_timeout = timeout;
        self
    }

    /// Hard cap on open connections: base size plus overflow.
    pub fn max_connections(&self) -> u32 {
        self.pool_size + self.max_overflow
    }
}

/// Why no pool is available
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("missing database credentials: {}", field_list(.fields))]
    MissingCredentials { fields: Vec<CredentialField> },

    #[error("database unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("database liveness probe timed out after {after:?}")]
    ProbeTimedOut { after: Duration },
}

fn field_list(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Connection options for the resolved credentials and target.
pub fn connect_options(
    user: &str,
    password: &str,
    database: &str,
    connection_name: &str,
    target: &DatabaseTarget,
) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .username(user)
        .password(password)
        .database(database);

    match target {
        DatabaseTarget::UnixSocket { dir } => options.socket(dir.join(connection_name)),
        DatabaseTarget::Tcp { host, port } => options.host(host).port(*port),
    }
}

/// Build the pool and verify it with one liveness probe.
///
/// # Errors
///
/// `MissingCredentials` when any database field is absent (no connection is
/// attempted), `Unreachable` when the probe fails, `ProbeTimedOut` when it
/// does not finish within the borrow timeout.
pub async fn bootstrap_pool(
    credentials: &Credentials,
    settings: &PoolSettings,
) -> Result<MySqlPool, BootstrapError> {
    let (Some(user), Some(password), Some(database), Some(connection_name)) = (
        credentials.get(CredentialField::DbUser),
        credentials.get(CredentialField::DbPassword),
        credentials.get(CredentialField::DbName),
        credentials.get(CredentialField::ConnectionName),
    ) else {
        return Err(BootstrapError::MissingCredentials {
            fields: credentials.missing_database_fields(),
        });
    };

    tracing::info!(
        database,
        connection_name,
        target = ?settings.target,
        max_connections = settings.max_connections(),
        "creating database pool"
    );

    let options = connect_options(
        user,
        password,
        database,
        connection_name,
        &settings.target,
    );

    // One direct connection, outside the pool so acquire never retries it
    probe(&options, settings.borrow_timeout).await?;

    let pool = MySqlPoolOptions::new()
        .max_connections(settings.max_connections())
        .min_connections(0)
        .acquire_timeout(settings.borrow_timeout)
        .max_lifetime(settings.recycle_age)
        .connect_lazy_with(options);

    tracing::info!("database pool ready");
    Ok(pool)
}

/// Open a single connection, run `SELECT 1`, close it.
async fn probe(options: &MySqlConnectOptions, limit: Duration) -> Result<(), BootstrapError> {
    let attempt = async {
        let mut conn = MySqlConnection::connect_with(options).await?;
        sqlx::query("SELECT 1").execute(&mut conn).await?;
        conn.close().await
    };

    match tokio::time::timeout(limit, attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "database liveness probe failed");
            Err(BootstrapError::Unreachable(e))
        }
        Err(_) => {
            tracing::error!(after = ?limit, "database liveness probe timed out");
            Err(BootstrapError::ProbeTimedOut { after: limit })
        }
    }
}

/// Owner of the process-wide pool, or of the reason there is none
pub struct PoolManager {
    pool: Option<MySqlPool>,
    source: Option<Arc<dyn RecordSource>>,
    failure: Option<BootstrapError>,
}

impl PoolManager {
    /// Run the one-shot bootstrap and remember its outcome.
    pub async fn bootstrap(credentials: &Credentials, settings: &PoolSettings) -> Self {
        match bootstrap_pool(credentials, settings).await {
            Ok(pool) => Self::from_pool(pool),
            Err(err) => {
                tracing::warn!(error = %err, "database pool unavailable");
                Self::unavailable(err)
            }
        }
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            source: Some(Arc::new(pool.clone())),
            pool: Some(pool),
            failure: None,
        }
    }

    /// Serve records from any source (e.g. `MemorySource` in tests).
    pub fn from_source(source: Arc<dyn RecordSource>) -> Self {
        Self {
            pool: None,
            source: Some(source),
            failure: None,
        }
    }

    pub fn unavailable(failure: BootstrapError) -> Self {
        Self {
            pool: None,
            source: None,
            failure: Some(failure),
        }
    }

    /// Shared handle for request-time use; `None` when bootstrap failed.
    pub fn current(&self) -> Option<Arc<dyn RecordSource>> {
        self.source.clone()
    }

    pub fn is_available(&self) -> bool {
        self.source.is_some()
    }

    pub fn failure(&self) -> Option<&BootstrapError> {
        self.failure.as_ref()
    }

    /// Close pooled connections (on shutdown).
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
