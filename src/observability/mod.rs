//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Broker endpoints produce:
//!     → logging.rs (structured log events, session_id on every line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Session id and request id flow through all log lines
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
