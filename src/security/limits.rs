//! Request body limits.
//!
//! axum's own 2MB default is replaced by the configured size, enforced
//! before the body is read. Oversized bodies answer 413.

use axum::extract::DefaultBodyLimit;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::SecurityConfig;

pub fn body_limit_layers(config: &SecurityConfig) -> (DefaultBodyLimit, RequestBodyLimitLayer) {
    (
        DefaultBodyLimit::disable(),
        RequestBodyLimitLayer::new(config.max_body_size),
    )
}
