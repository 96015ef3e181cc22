/// Structured error types for menudata-core.
///
/// Secret lookups and table validation return these instead of silently
/// falling back to an absent value, so callers decide how to degrade.
use thiserror::Error;

/// Failure to read a value from the secret store
#[derive(Error, Debug)]
pub enum SecretError {
    /// No project/scope is configured, so no secret path can be built
    #[error("no project configured for secret lookup")]
    MissingProject,

    /// The secret (or its latest version) does not exist
    #[error("secret '{name}' not found")]
    NotFound { name: String },

    /// The store answered with a non-success status
    #[error("secret store returned HTTP {status} for '{name}'")]
    Status { name: String, status: u16 },

    /// Network or protocol failure talking to the store or metadata server
    #[error("secret store request failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// Payload was not valid base64 or not UTF-8
    #[error("secret '{name}' has an undecodable payload: {reason}")]
    Payload { name: String, reason: String },
}

impl SecretError {
    /// Create a not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a payload error
    pub fn payload(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Payload {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Validation error for configured identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field}: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },
}
