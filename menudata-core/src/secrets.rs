//! Secret store lookups
//!
//! `SecretResolver` is the seam used during credential resolution:
//! - `GcpSecretManager` reads the latest version of a secret over REST,
//!   authenticating with a token from the GCE metadata server
//! - `StaticSecrets` serves values from memory (tests, local runs)
//!
//! Resolvers never cache; each call is one lookup.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::SecretError;

/// Default GCE metadata server
pub const METADATA_URL: &str = "http://metadata.google.internal";

/// Default Secret Manager API endpoint
pub const SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

/// Per-request timeout for secret store calls
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Named secret lookup (testable)
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<String, SecretError>;
}

/// Google Secret Manager client
pub struct GcpSecretManager {
    http: reqwest::Client,
    project: Option<String>,
    metadata_url: String,
    api_url: String,
}

impl GcpSecretManager {
    /// Create a client for `project`. Without a project every lookup fails
    /// with `SecretError::MissingProject`.
    pub fn new(project: Option<String>) -> Result<Self, SecretError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            project: project.filter(|p| !p.trim().is_empty()),
            metadata_url: METADATA_URL.to_string(),
            api_url: SECRET_MANAGER_URL.to_string(),
        })
    }

    /// Point the client at other endpoints (for testing).
    pub fn with_endpoints(mut self, metadata_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.metadata_url = metadata_url.into();
        self.api_url = api_url.into();
        self
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    async fn access_token(&self) -> Result<String, SecretError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let token = self
            .http
            .get(format!(
                "{}/computeMetadata/v1/instance/service-accounts/default/token",
                self.metadata_url
            ))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretResolver for GcpSecretManager {
    async fn resolve(&self, name: &str) -> Result<String, SecretError> {
        #[derive(Deserialize)]
        struct AccessResponse {
            payload: Payload,
        }

        #[derive(Deserialize)]
        struct Payload {
            data: String,
        }

        let project = self.project.as_deref().ok_or(SecretError::MissingProject)?;
        let token = self.access_token().await?;

        let response = self
            .http
            .get(format!(
                "{}/v1/projects/{}/secrets/{}/versions/latest:access",
                self.api_url, project, name
            ))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SecretError::not_found(name));
        }
        if !status.is_success() {
            return Err(SecretError::Status {
                name: name.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.json::<AccessResponse>().await?;
        let bytes = STANDARD
            .decode(body.payload.data.as_bytes())
            .map_err(|e| SecretError::payload(name, e.to_string()))?;

        String::from_utf8(bytes).map_err(|e| SecretError::payload(name, e.to_string()))
    }
}

/// In-memory secrets
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretResolver for StaticSecrets {
    async fn resolve(&self, name: &str) -> Result<String, SecretError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::not_found(name))
    }
}
