//! menudata-core: configuration primitives for the menudata service
//!
//! Holds everything that does not need a database connection or an HTTP
//! server: the credential bundle and its resolution, the secret store client,
//! and the filter/query builder used by the objects endpoint.

pub mod credentials;
pub mod error;
pub mod filters;
pub mod query;
pub mod secrets;

pub use credentials::{CredentialField, CredentialPresence, Credentials};
pub use error::{SecretError, ValidationError};
pub use filters::{FilterKey, FilterSet};
pub use query::{Binding, QueryBuilder, QueryStatement, TableName};
pub use secrets::{GcpSecretManager, SecretResolver, StaticSecrets};
