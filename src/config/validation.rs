//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::DispatcherConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &DispatcherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            "must be greater than zero",
        ));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.health_check.max_failures == 0 {
        errors.push(ValidationError::new(
            "health_check.max_failures",
            "must be greater than zero",
        ));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new(
            "health_check.path",
            format!("must start with '/': {}", config.health_check.path),
        ));
    }

    if config.forward.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "forward.timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.persistence.path.is_empty() {
        errors.push(ValidationError::new("persistence.path", "must not be empty"));
    }

    if config.classifier.enabled {
        if config.classifier.url.is_empty() {
            errors.push(ValidationError::new(
                "classifier.url",
                "required when the classifier is enabled",
            ));
        } else if Url::parse(&config.classifier.url).is_err() {
            errors.push(ValidationError::new(
                "classifier.url",
                format!("not a valid URL: {}", config.classifier.url),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
