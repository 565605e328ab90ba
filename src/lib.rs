//! ClassicModels REST API library.

pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod resources;
pub mod security;

pub use config::schema::ApiConfig;
pub use http::{ApiServer, AppState};
pub use lifecycle::Shutdown;
