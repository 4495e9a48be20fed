//! Database Backend Abstractions
//!
//! Connection provider traits shared by every backend, plus the backend type
//! used to pick a driver and a statement dialect from configuration.

pub mod core;
pub mod postgres;

pub use self::core::*;
pub use postgres::PostgresBackend;

use crate::config::ConfigError;
use crate::dialect::SqlDialect;

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    MySQL,
    SQLite,
    SqlServer,
}

impl DatabaseBackendType {
    /// Statement dialect spoken by this backend
    pub fn dialect(&self) -> SqlDialect {
        match self {
            DatabaseBackendType::PostgreSQL => SqlDialect::PostgreSQL,
            DatabaseBackendType::MySQL => SqlDialect::MySQL,
            DatabaseBackendType::SQLite => SqlDialect::SQLite,
            DatabaseBackendType::SqlServer => SqlDialect::SqlServer,
        }
    }

    /// Detect the backend from a connection URL scheme
    pub fn from_url(database_url: &str) -> Result<Self, ConfigError> {
        let scheme = url::Url::parse(database_url)
            .map(|parsed| parsed.scheme().to_string())
            .or_else(|_| {
                database_url
                    .split_once(':')
                    .map(|(scheme, _)| scheme.to_string())
                    .ok_or(())
            })
            .map_err(|_| ConfigError::InvalidValue {
                field: "database_url".to_string(),
                value: database_url.to_string(),
                expected: "a URL with a database scheme".to_string(),
            })?;

        scheme.parse()
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::MySQL => write!(f, "mysql"),
            DatabaseBackendType::SQLite => write!(f, "sqlite"),
            DatabaseBackendType::SqlServer => write!(f, "sqlserver"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "npgsql" => Ok(DatabaseBackendType::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseBackendType::MySQL),
            "sqlite" | "file" => Ok(DatabaseBackendType::SQLite),
            "sqlserver" | "mssql" => Ok(DatabaseBackendType::SqlServer),
            _ => Err(ConfigError::InvalidValue {
                field: "driver".to_string(),
                value: s.to_string(),
                expected: "postgresql, mysql, sqlite or sqlserver".to_string(),
            }),
        }
    }
}
