//! Credential bundle - database login, connection name and API key
//!
//! Values come from environment variables first. When a secret resolver is
//! configured, any field still missing is looked up in the secret store.
//! Blank values count as absent everywhere.

use std::fmt;

use serde::Serialize;

use crate::secrets::SecretResolver;

/// One field of the credential bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    DbUser,
    DbPassword,
    DbName,
    ConnectionName,
    ApiKey,
}

impl CredentialField {
    /// Every field, in resolution order
    pub const ALL: [CredentialField; 5] = [
        Self::DbUser,
        Self::DbPassword,
        Self::DbName,
        Self::ConnectionName,
        Self::ApiKey,
    ];

    /// Fields required before a pool may be built
    pub const DATABASE: [CredentialField; 4] = [
        Self::DbUser,
        Self::DbPassword,
        Self::DbName,
        Self::ConnectionName,
    ];

    /// Environment variables read for this field, primary name first
    pub fn env_vars(self) -> &'static [&'static str] {
        match self {
            Self::DbUser => &["DB_USER"],
            Self::DbPassword => &["DB_PASS", "DB_PASSWORD"],
            Self::DbName => &["DB_NAME"],
            Self::ConnectionName => &["CLOUD_SQL_CONNECTION_NAME", "DB_CONNECTION_NAME"],
            Self::ApiKey => &["API_KEY"],
        }
    }

    /// Secret name used when the value is fetched from the secret store
    pub fn secret_name(self) -> &'static str {
        match self {
            Self::DbUser => "db-user",
            Self::DbPassword => "db-password",
            Self::DbName => "db-name",
            Self::ConnectionName => "db-connection-name",
            Self::ApiKey => "api-key",
        }
    }

    /// Key used in logs and health details
    pub fn key(self) -> &'static str {
        match self {
            Self::DbUser => "db_user",
            Self::DbPassword => "db_password",
            Self::DbName => "db_name",
            Self::ConnectionName => "db_connection_name",
            Self::ApiKey => "api_key",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolved credentials. Each field is either a non-blank string or absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    db_user: Option<String>,
    db_password: Option<String>,
    db_name: Option<String>,
    connection_name: Option<String>,
    api_key: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment only.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup (for testing).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::default();
        for field in CredentialField::ALL {
            if let Some(value) = field.env_vars().iter().find_map(|name| non_blank(lookup(name)))
            {
                credentials.set(field, value);
            }
        }
        credentials
    }

    /// Read from the environment lookup, then fill gaps from the secret store.
    ///
    /// Secret failures are logged and leave the field absent; they never abort
    /// resolution of the remaining fields.
    pub async fn resolve<F>(lookup: F, resolver: Option<&dyn SecretResolver>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::from_lookup(lookup);
        let Some(resolver) = resolver else {
            return credentials;
        };

        for field in CredentialField::ALL {
            if credentials.get(field).is_some() {
                continue;
            }
            let secret = field.secret_name();
            match resolver.resolve(secret).await {
                Ok(value) => {
                    if credentials.set(field, value) {
                        tracing::debug!(field = %field, secret, "credential resolved from secret store");
                    } else {
                        tracing::warn!(field = %field, secret, "secret store returned a blank value");
                    }
                }
                Err(err) => {
                    tracing::warn!(field = %field, secret, error = %err, "failed to resolve secret");
                }
            }
        }

        credentials
    }

    /// Builder-style setter, mainly for tests.
    pub fn with(mut self, field: CredentialField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Store a value; blank values clear the field. Returns whether a value was kept.
    pub fn set(&mut self, field: CredentialField, value: impl Into<String>) -> bool {
        let value = non_blank(Some(value.into()));
        let kept = value.is_some();
        *self.slot_mut(field) = value;
        kept
    }

    /// Get a field value, if present.
    pub fn get(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::DbUser => self.db_user.as_deref(),
            CredentialField::DbPassword => self.db_password.as_deref(),
            CredentialField::DbName => self.db_name.as_deref(),
            CredentialField::ConnectionName => self.connection_name.as_deref(),
            CredentialField::ApiKey => self.api_key.as_deref(),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.get(CredentialField::ApiKey)
    }

    /// Database fields that are still missing, in declaration order.
    pub fn missing_database_fields(&self) -> Vec<CredentialField> {
        CredentialField::DATABASE
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    /// Presence snapshot for health reporting.
    pub fn presence(&self) -> CredentialPresence {
        CredentialPresence {
            api_key: self.api_key.is_some(),
            db_user: self.db_user.is_some(),
            db_password: self.db_password.is_some(),
            db_name: self.db_name.is_some(),
            db_connection_name: self.connection_name.is_some(),
        }
    }

    fn slot_mut(&mut self, field: CredentialField) -> &mut Option<String> {
        match field {
            CredentialField::DbUser => &mut self.db_user,
            CredentialField::DbPassword => &mut self.db_password,
            CredentialField::DbName => &mut self.db_name,
            CredentialField::ConnectionName => &mut self.connection_name,
            CredentialField::ApiKey => &mut self.api_key,
        }
    }
}

// Never print secret values
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Credentials");
        for field in CredentialField::ALL {
            let shown = match (field, self.get(field)) {
                (_, None) => "<absent>",
                (CredentialField::DbUser | CredentialField::DbName | CredentialField::ConnectionName, Some(v)) => v,
                (_, Some(_)) => "<redacted>",
            };
            out.field(field.key(), &shown);
        }
        out.finish()
    }
}

/// Which credential fields were resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CredentialPresence {
    pub api_key: bool,
    pub db_user: bool,
    pub db_password: bool,
    pub db_name: bool,
    pub db_connection_name: bool,
}

impl CredentialPresence {
    /// True when every field, api key included, is present.
    pub fn all_present(&self) -> bool {
        self.api_key && self.db_user && self.db_password && self.db_name && self.db_connection_name
    }
}

/// Whitespace-only means absent. Kept values lose only a trailing line
/// terminator (secret payloads usually end in one); other whitespace is part
/// of the value.
fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }
    let kept = value.trim_end_matches(['\r', '\n']);
    Some(kept.to_owned())
}
