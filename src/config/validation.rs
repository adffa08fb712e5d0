//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Check the static folder exists before the server mounts it
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("channel.max_body_size must be greater than zero")]
    ZeroBodySize,

    #[error("static_files.folder {0:?} is not a directory")]
    MissingStaticFolder(String),

    #[error("static_files.prefix {0:?} must start with '/'")]
    InvalidStaticPrefix(String),

    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.channel.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodySize);
    }

    if let Some(static_files) = &config.static_files {
        if !Path::new(&static_files.folder).is_dir() {
            errors.push(ValidationError::MissingStaticFolder(static_files.folder.clone()));
        }
        if let Some(prefix) = &static_files.prefix {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::InvalidStaticPrefix(prefix.clone()));
            }
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }
    if observability
        .log_level
        .parse::<tracing::level_filters::LevelFilter>()
        .is_err()
    {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticFilesConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.channel.max_body_size = 0;
        config.static_files = Some(StaticFilesConfig {
            folder: "/definitely/not/here".into(),
            prefix: Some("assets".into()),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroBodySize));
        assert!(errors.contains(&ValidationError::InvalidStaticPrefix("assets".into())));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_level() {
        let mut config = ServerConfig::default();
        config.observability.log_level = "loud".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidLogLevel("loud".into())])
        );
    }
}
