//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → [auth, throttle, resource handlers]
//!     → pagination.rs (list envelopes)
//!     → response.rs (errors to JSON)
//!     → Send to client
//! ```

pub mod extract;
pub mod pagination;
pub mod request;
pub mod response;
pub mod server;

pub use extract::{JsonObject, KeyPath};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ApiError, FieldErrors};
pub use server::{ApiServer, AppState};
