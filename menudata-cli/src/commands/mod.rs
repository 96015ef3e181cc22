//! Subcommands and the bootstrap they share

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::Args;
use menudata_core::{CredentialField, Credentials, GcpSecretManager, SecretResolver, TableName};
use menudata_server::{AppState, DatabaseTarget, PoolManager, PoolSettings};

pub mod check;
pub mod serve;

/// Table, database target and credential source options
#[derive(Args, Debug, Clone)]
pub struct BootstrapArgs {
    /// Table served by /api/objects
    #[arg(long, env = "OBJECTS_TABLE", default_value = "objects")]
    pub table: String,

    /// Directory holding the Cloud SQL unix sockets
    #[arg(long, env = "DB_SOCKET_DIR", default_value = "/cloudsql")]
    pub socket_dir: PathBuf,

    /// Connect over TCP to this host instead of the unix socket
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// TCP port, used with --db-host
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    /// Fill missing credentials from Google Secret Manager
    #[arg(long, env = "USE_SECRET_MANAGER", value_parser = BoolishValueParser::new())]
    pub secret_manager: bool,

    /// Project that owns the secrets
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project: Option<String>,

    /// Exit instead of running degraded when the pool cannot be built
    #[arg(long, env = "STRICT_STARTUP", value_parser = BoolishValueParser::new())]
    pub strict: bool,
}

impl BootstrapArgs {
    pub fn table_name(&self) -> Result<TableName> {
        TableName::new(&self.table).with_context(|| format!("invalid table name '{}'", self.table))
    }

    pub fn pool_settings(&self) -> PoolSettings {
        let target = match &self.db_host {
            Some(host) if !host.trim().is_empty() => DatabaseTarget::Tcp {
                host: host.clone(),
                port: self.db_port,
            },
            _ => DatabaseTarget::UnixSocket {
                dir: self.socket_dir.clone(),
            },
        };
        PoolSettings::default().with_target(target)
    }

    /// Environment first, then the secret store when enabled.
    pub async fn resolve_credentials(&self) -> Result<Credentials> {
        let lookup = |name: &str| std::env::var(name).ok();

        if !self.secret_manager {
            return Ok(Credentials::from_lookup(lookup));
        }

        let manager = GcpSecretManager::new(self.project.clone())
            .context("failed to build Secret Manager client")?;
        if manager.project().is_none() {
            tracing::warn!("secret manager enabled without GOOGLE_CLOUD_PROJECT; lookups will fail");
        }

        let resolver: &dyn SecretResolver = &manager;
        Ok(Credentials::resolve(lookup, Some(resolver)).await)
    }

    /// Resolve credentials, build the pool once and assemble shared state.
    pub async fn build_state(&self) -> Result<Arc<AppState>> {
        self.table_name()?;
        let credentials = self.resolve_credentials().await?;
        self.state_from(credentials).await
    }

    /// Bootstrap over already-resolved credentials, honoring `--strict`.
    pub async fn state_from(&self, credentials: Credentials) -> Result<Arc<AppState>> {
        let table = self.table_name()?;

        let missing: Vec<_> = CredentialField::ALL
            .into_iter()
            .filter(|field| credentials.get(*field).is_none())
            .map(CredentialField::key)
            .collect();
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "credentials incomplete");
        }

        let database = PoolManager::bootstrap(&credentials, &self.pool_settings()).await;
        if self.strict {
            if let Some(failure) = database.failure() {
                bail!("database bootstrap failed: {failure}");
            }
        }

        Ok(Arc::new(AppState::new(database, &credentials, &table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BootstrapArgs {
        BootstrapArgs {
            table: "objects".into(),
            socket_dir: PathBuf::from("/cloudsql"),
            db_host: None,
            db_port: 3306,
            secret_manager: false,
            project: None,
            strict: false,
        }
    }

    #[test]
    fn socket_target_by_default() {
        assert_eq!(
            args().pool_settings().target,
            DatabaseTarget::UnixSocket {
                dir: PathBuf::from("/cloudsql")
            }
        );
    }

    #[test]
    fn tcp_target_when_host_given() {
        let args = BootstrapArgs {
            db_host: Some("127.0.0.1".into()),
            db_port: 3307,
            ..args()
        };
        assert_eq!(
            args.pool_settings().target,
            DatabaseTarget::Tcp {
                host: "127.0.0.1".into(),
                port: 3307
            }
        );
    }

    #[test]
    fn blank_host_keeps_socket() {
        let args = BootstrapArgs {
            db_host: Some("  ".into()),
            ..args()
        };
        assert!(matches!(
            args.pool_settings().target,
            DatabaseTarget::UnixSocket { .. }
        ));
    }

    #[test]
    fn invalid_table_is_rejected() {
        let args = BootstrapArgs {
            table: "menu; DROP TABLE x".into(),
            ..args()
        };
        let err = args.table_name().unwrap_err();
        assert!(err.to_string().contains("invalid table name"));
    }

    fn no_credentials() -> Credentials {
        Credentials::from_lookup(|_| None)
    }

    #[tokio::test]
    async fn strict_mode_fails_on_missing_credentials() {
        let args = BootstrapArgs {
            strict: true,
            ..args()
        };

        let err = args.state_from(no_credentials()).await.err().unwrap();
        assert!(err.to_string().contains("database bootstrap failed"));
        assert!(err.to_string().contains("db_user"));
    }

    #[tokio::test]
    async fn degraded_mode_keeps_running_without_pool() {
        let state = args().state_from(no_credentials()).await.unwrap();

        assert!(!state.database.is_available());
        assert!(!state.credentials.all_present());
    }
}
