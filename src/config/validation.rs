//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, size limits)
//! - Check the upstream address is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::proxy::Upstream;

/// One semantic problem in a configuration.
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

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if let Some(proxy) = &config.proxy {
        if let Err(e) = Upstream::parse(&proxy.upstream) {
            errors.push(ValidationError::new("proxy.upstream", e.to_string()));
        }
        if proxy.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "proxy.timeout_secs",
                "must be greater than zero",
            ));
        } else if proxy.timeout_secs >= config.listener.request_timeout_secs {
            // The listener timeout would answer before the upstream deadline maps to 504.
            errors.push(ValidationError::new(
                "proxy.timeout_secs",
                format!(
                    "must be less than listener.request_timeout_secs ({})",
                    config.listener.request_timeout_secs
                ),
            ));
        }
    }

    let multipart = &config.multipart;
    for (field, value) in [
        ("multipart.max_request_size", multipart.max_request_size),
        ("multipart.max_file_size", multipart.max_file_size),
        ("multipart.max_in_memory_size", multipart.max_in_memory_size),
    ] {
        if value < -1 {
            errors.push(ValidationError::new(field, "must be -1 (unlimited) or >= 0"));
        }
    }
    if multipart.max_request_size >= 0
        && multipart.max_file_size >= 0
        && multipart.max_file_size > multipart.max_request_size
    {
        errors.push(ValidationError::new(
            "multipart.max_file_size",
            "cannot exceed multipart.max_request_size",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
