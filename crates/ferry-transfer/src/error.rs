//! Error types for ferry-transfer.
//!
//! Only run-level and capability-level failures travel as [`Error`]. Problems
//! that belong to a single record (a column type that cannot be mapped, a user
//! whose hash is malformed, a document the destination rejects) are recorded
//! as [`crate::log::Log`] entries and counter increments instead.

use thiserror::Error;

use crate::resources::ResourceKind;

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while transferring resources.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend unreachable or refusing the connection.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Backend rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A requested resource kind is not offered by an adapter.
    #[error("Cannot transfer unsupported resource '{resource}' with {adapter}")]
    UnsupportedResource {
        /// Adapter name.
        adapter: String,
        /// Requested resource kind.
        resource: ResourceKind,
    },

    /// An export or import operation the adapter does not implement.
    #[error("{adapter} does not implement {operation}")]
    UnsupportedOperation {
        /// Adapter name.
        adapter: String,
        /// Operation name, e.g. `export_files`.
        operation: &'static str,
    },

    /// A resource kind was requested without the kind it depends on.
    #[error("Resource '{resource}' requires '{requires}' to be transferred first")]
    MissingDependency {
        /// Requested resource kind.
        resource: ResourceKind,
        /// Kind it depends on.
        requires: ResourceKind,
    },

    /// A password hash that cannot be migrated.
    #[error("Invalid credential for user '{user_id}': {reason}")]
    InvalidCredential {
        /// Offending user.
        user_id: String,
        /// What is wrong with the hash.
        reason: String,
    },

    /// REST backend answered with a status >= 400.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body (decoded JSON is re-encoded as text).
        body: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Relational backend failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Source data could not be read or converted.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Destination could not accept data.
    #[error("Import error: {0}")]
    Import(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Builds an [`Error::UnsupportedOperation`] for `adapter`.
    pub fn unsupported_operation(adapter: &str, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            adapter: adapter.to_string(),
            operation,
        }
    }

    /// Builds an [`Error::InvalidCredential`].
    pub fn invalid_credential(user_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            user_id: user_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error must stop the whole run rather than a single record.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Connectivity(_)
                | Self::Authentication(_)
                | Self::UnsupportedResource { .. }
                | Self::UnsupportedOperation { .. }
                | Self::MissingDependency { .. }
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::Connectivity("Connection pool timeout".to_string()),
            sqlx::Error::PoolClosed => Self::Connectivity("Connection pool closed".to_string()),
            sqlx::Error::Io(e) => Self::Connectivity(e.to_string()),
            sqlx::Error::Tls(e) => Self::Connectivity(e.to_string()),
            sqlx::Error::Configuration(e) => Self::Config(e.to_string()),
            sqlx::Error::Database(db_err) => {
                // 28P01 invalid_password, 28000 invalid_authorization_specification
                if db_err
                    .code()
                    .is_some_and(|c| c == "28P01" || c == "28000")
                {
                    Self::Authentication(db_err.message().to_string())
                } else {
                    Self::Database(db_err.to_string())
                }
            }
            other => Self::Database(other.to_string()),
        }
    }
}
