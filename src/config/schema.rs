//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::rate_limit::{Scope, ThrottleRate};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Token signing and password hashing.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub throttle: ThrottleConfig,

    /// List pagination.
    pub pagination: PaginationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,

    /// Seconds SQLite waits on a locked database before failing.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://classicmodels.db?mode=rwc".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            busy_timeout_secs: 5,
        }
    }
}

/// Token and password settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub jwt_secret: String,

    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds.
    pub refresh_token_ttl_secs: i64,

    /// bcrypt work factor.
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            access_token_ttl_secs: 60 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Admit requests when the counter store cannot answer.
    pub fail_open: bool,

    /// Use the first X-Forwarded-For entry as the client address.
    pub trust_forwarded_for: bool,

    /// Upper bound on tracked (scope, identity) windows.
    pub max_tracked_keys: usize,

    /// Interval for the background sweep of expired windows.
    pub sweep_interval_secs: u64,

    /// Per-scope rates.
    pub rates: ThrottleRates,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_open: true,
            trust_forwarded_for: false,
            max_tracked_keys: 100_000,
            sweep_interval_secs: 60,
            rates: ThrottleRates::default(),
        }
    }
}

/// One rate per throttle scope, written as `"N/period"`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleRates {
    pub login: ThrottleRate,
    pub register: ThrottleRate,
    pub token_refresh: ThrottleRate,
    pub logout: ThrottleRate,
    pub current_user: ThrottleRate,
    pub read: ThrottleRate,
    pub write: ThrottleRate,
    pub burst: ThrottleRate,
    pub demo: ThrottleRate,
}

impl ThrottleRates {
    /// Rate configured for a scope.
    pub fn for_scope(&self, scope: Scope) -> ThrottleRate {
        match scope {
            Scope::Login => self.login,
            Scope::Register => self.register,
            Scope::TokenRefresh => self.token_refresh,
            Scope::Logout => self.logout,
            Scope::CurrentUser => self.current_user,
            Scope::Read => self.read,
            Scope::Write => self.write,
            Scope::Burst => self.burst,
            Scope::Demo => self.demo,
        }
    }
}

impl Default for ThrottleRates {
    fn default() -> Self {
        Self {
            login: ThrottleRate::per_hour(5),
            register: ThrottleRate::per_hour(5),
            token_refresh: ThrottleRate::per_minute(10),
            logout: ThrottleRate::per_minute(20),
            current_user: ThrottleRate::per_minute(60),
            read: ThrottleRate::per_minute(100),
            write: ThrottleRate::per_minute(20),
            burst: ThrottleRate::per_minute(100),
            demo: ThrottleRate::per_minute(10),
        }
    }
}

/// List pagination settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows per page.
    pub page_size: u32,

    /// Origin used for next/previous links, e.g. "https://api.example.com".
    /// Falls back to the request Host header.
    pub public_base_url: Option<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            public_base_url: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format: "pretty" or "compact".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Debug tooling. Never enable in production.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Mount the debug routes.
    pub enabled: bool,

    /// Cap for the delay route in seconds.
    pub max_delay_secs: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_delay_secs: 10,
        }
    }
}
