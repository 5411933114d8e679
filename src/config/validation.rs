//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer sizes > 0, limits > 0)
//! - Check addresses and log levels parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use tracing::Level;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("listener.max_connections must be greater than 0")]
    ZeroMaxConnections,

    #[error("relay.buffer_size must be greater than 0")]
    ZeroBufferSize,

    #[error("relay.max_head_bytes must be greater than 0")]
    ZeroMaxHeadBytes,

    #[error("observability.log_level {0:?} is not a log level")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.max_connections == Some(0) {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.relay.buffer_size == 0 {
        errors.push(ValidationError::ZeroBufferSize);
    }
    if config.relay.max_head_bytes == 0 {
        errors.push(ValidationError::ZeroMaxHeadBytes);
    }
    if config.observability.log_level.parse::<Level>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
