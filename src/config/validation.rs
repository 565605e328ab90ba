//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check the bind addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ApiConfig;
use crate::security::rate_limit::Scope;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            "must be a socket address",
        ));
    }

    if config.database.url.trim().is_empty() {
        errors.push(ValidationError::new("database.url", "must not be empty"));
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::new(
            "database.max_connections",
            "must be greater than zero",
        ));
    }

    if config.auth.jwt_secret.trim().is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    }
    if config.auth.access_token_ttl_secs <= 0 {
        errors.push(ValidationError::new(
            "auth.access_token_ttl_secs",
            "must be positive",
        ));
    }
    if config.auth.refresh_token_ttl_secs <= config.auth.access_token_ttl_secs {
        errors.push(ValidationError::new(
            "auth.refresh_token_ttl_secs",
            "must outlive the access token",
        ));
    }
    if !(4..=31).contains(&config.auth.bcrypt_cost) {
        errors.push(ValidationError::new(
            "auth.bcrypt_cost",
            "must be between 4 and 31",
        ));
    }

    for scope in Scope::ALL {
        let rate = config.throttle.rates.for_scope(scope);
        if rate.limit == 0 || rate.window.is_zero() {
            errors.push(ValidationError::new(
                format!("throttle.rates.{}", scope.as_str()),
                "limit and window must be positive",
            ));
        }
    }
    if config.throttle.max_tracked_keys == 0 {
        errors.push(ValidationError::new(
            "throttle.max_tracked_keys",
            "must be greater than zero",
        ));
    }
    if config.throttle.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "throttle.sweep_interval_secs",
            "must be greater than zero",
        ));
    }

    if config.pagination.page_size == 0 {
        errors.push(ValidationError::new(
            "pagination.page_size",
            "must be greater than zero",
        ));
    }
    if let Some(base) = &config.pagination.public_base_url {
        if url::Url::parse(base).is_err() {
            errors.push(ValidationError::new(
                "pagination.public_base_url",
                "must be an absolute URL",
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
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
            "must be a socket address",
        ));
    }
    if !matches!(config.observability.log_format.as_str(), "pretty" | "compact") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be \"pretty\" or \"compact\"",
        ));
    }

    if config.debug.enabled && config.debug.max_delay_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "debug.max_delay_secs",
            "must be below timeouts.request_secs",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
