//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (pending gauge, routed messages, routing errors, latency)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) and correlation id appear on every log line
//! - Metric helpers are no-ops until a recorder is installed, so tests need no setup

pub mod logging;
pub mod metrics;
