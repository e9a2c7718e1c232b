//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Keep the handler deadline inside the request deadline
//! - Check addresses and log filters parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },
    #[error("timeouts.handler_secs ({handler_secs}) exceeds timeouts.request_secs ({request_secs})")]
    HandlerExceedsRequest { handler_secs: u64, request_secs: u64 },
    #[error("observability.log_level: invalid filter {0:?}")]
    InvalidLogFilter(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "timeouts.request_secs",
        });
    }

    let timeouts = &config.timeouts;
    if timeouts.request_secs > 0 && timeouts.handler_secs > timeouts.request_secs {
        errors.push(ValidationError::HandlerExceedsRequest {
            handler_secs: timeouts.handler_secs,
            request_secs: timeouts.request_secs,
        });
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "limits.max_body_size",
        });
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogFilter(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
