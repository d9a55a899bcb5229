//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, runtime-adjustable level)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the request-id layer into access logs
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{InvalidLogLevel, LogLevel};
