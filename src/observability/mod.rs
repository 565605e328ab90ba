//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → tracing.rs (span carrying the request ID)
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Metrics are cheap (atomic increments)
//! - The metrics endpoint is off unless configured

pub mod logging;
pub mod metrics;
pub mod tracing;
