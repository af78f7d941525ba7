//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges. All errors are
//! collected so an operator sees every problem in one pass.

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{AppConfig, SinkKind};

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("observer.threshold_mb must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f64),

    #[error("observer.log_destination must not be empty when sink = \"file\"")]
    EmptyDestination,

    #[error("observer.request_id_header {0:?} is not a valid header name")]
    InvalidHeader(String),

    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let observer = &config.observer;

    if !observer.threshold_mb.is_finite() || observer.threshold_mb < 0.0 {
        errors.push(ValidationError::InvalidThreshold(observer.threshold_mb));
    }

    if observer.sink == SinkKind::File && observer.log_destination.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDestination);
    }

    if !observer.request_id_header.is_empty()
        && HeaderName::from_bytes(observer.request_id_header.as_bytes()).is_err()
    {
        errors.push(ValidationError::InvalidHeader(observer.request_id_header.clone()));
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
