//! Named connection resolution
//!
//! A connection name resolves to a URL and a driver identifier:
//!
//! - `default` reads `DATABASE_URL` and `DATABASE_DRIVER`
//! - any other name reads `DATABASE_URL_<NAME>` and `DATABASE_DRIVER_<NAME>`
//!
//! When no driver variable is set the driver is inferred from the URL scheme.

use std::env;
use thiserror::Error;

use crate::backends::DatabaseBackendType;

/// Name used when no connection name is given
pub const DEFAULT_CONNECTION: &str = "default";

/// Resolved connection identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub name: String,
    pub url: String,
    pub driver: DatabaseBackendType,
}

impl ConnectionSettings {
    /// Resolve a named connection from the process environment
    pub fn from_env(name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(name, |key| env::var(key).ok())
    }

    /// Resolve a named connection through an arbitrary key lookup
    pub fn from_lookup<F>(name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = if name.trim().is_empty() { DEFAULT_CONNECTION } else { name.trim() };
        let url_key = url_key(name);
        let url = lookup(&url_key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar { var: url_key.clone() })?;

        let driver = match lookup(&driver_key(name)) {
            Some(driver) if !driver.trim().is_empty() => driver.trim().parse::<DatabaseBackendType>()?,
            _ => DatabaseBackendType::from_url(&url)?,
        };

        let settings = ConnectionSettings {
            name: name.to_string(),
            url,
            driver,
        };
        settings.validate()?;

        tracing::debug!("Resolved connection '{}' with driver {}", settings.name, settings.driver);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "url".to_string(),
                reason: "Database URL cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn url_key(name: &str) -> String {
    suffixed("DATABASE_URL", name)
}

fn driver_key(name: &str) -> String {
    suffixed("DATABASE_DRIVER", name)
}

fn suffixed(base: &str, name: &str) -> String {
    if name.eq_ignore_ascii_case(DEFAULT_CONNECTION) {
        base.to_string()
    } else {
        let suffix: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}_{}", base, suffix)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue { field: String, value: String, expected: String },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}
