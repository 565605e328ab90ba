//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ApiConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `database.url`.
pub const ENV_DATABASE_URL: &str = "CLASSICMODELS_DATABASE_URL";
/// Environment variable overriding `auth.jwt_secret`.
pub const ENV_JWT_SECRET: &str = "CLASSICMODELS_JWT_SECRET";
/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "CLASSICMODELS_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration.
///
/// Without a path the defaults are used. Environment overrides are applied
/// before validation in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ApiConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ApiConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay values from the environment. `lookup` is injectable for tests.
pub fn apply_env_overrides<F>(config: &mut ApiConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_DATABASE_URL) {
        config.database.url = url;
    }
    if let Some(secret) = lookup(ENV_JWT_SECRET) {
        config.auth.jwt_secret = secret;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_toml() {
        let config: ApiConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [throttle.rates]
            write = "3/min"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.throttle.rates.write.limit, 3);
        assert_eq!(config.throttle.rates.write.window.as_secs(), 60);
        // Untouched scopes keep their defaults
        assert_eq!(config.throttle.rates.read.limit, 100);
        assert_eq!(config.pagination.page_size, 10);
    }

    #[test]
    fn test_bad_rate_is_parse_error() {
        let result: Result<ApiConfig, _> = toml::from_str(
            r#"
            [throttle.rates]
            login = "five per hour"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ApiConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            ENV_JWT_SECRET => Some("from-env".to_string()),
            ENV_DATABASE_URL => Some("sqlite::memory:".to_string()),
            _ => None,
        });

        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
    }
}
