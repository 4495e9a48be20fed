//! Error types for the dynamic data layer
//!
//! Usage, validation and no-op failures come from command and query synthesis;
//! connection and database failures are surfaced as-is from the backend. Nothing
//! here is retried.

use thiserror::Error;

use crate::config::ConfigError;
use crate::validation::ValidationErrors;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for dynamic model operations
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Malformed convention call or invalid query options
    #[error("Usage error: {0}")]
    Usage(String),

    /// One or more records failed validation; carries every collected message
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The command would be semantically empty
    #[error("Nothing to execute: {0}")]
    NoOp(String),

    /// Connection could not be opened or acquired
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection name, driver or model identity could not be resolved
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Statement execution failed
    #[error("Database error: {0}")]
    Database(String),

    /// Table description failed or returned unusable metadata
    #[error("Schema error: {0}")]
    Schema(String),

    /// Input could not be normalized into an attribute bag
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transaction could not be started, committed or rolled back
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl ModelError {
    /// Validation messages when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ModelError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ModelError::Connection(err.to_string())
            }
            other => ModelError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

impl From<ValidationErrors> for ModelError {
    fn from(errors: ValidationErrors) -> Self {
        ModelError::Validation(errors)
    }
}
