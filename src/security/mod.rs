//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (request body size)
//!     → rate_limit.rs (per-scope sliding windows)
//!     → handler
//!     → headers.rs (security response headers)
//! ```
//!
//! # Design Decisions
//! - Throttles sit on the routes they guard, not globally
//! - The counter store failure policy is configurable
//! - No trust in client-supplied forwarding headers unless configured

pub mod headers;
pub mod limits;
pub mod rate_limit;
