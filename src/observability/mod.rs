//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Transport, pool and sniffer produce:
//!     → logging.rs (subscriber setup for structured events)
//!     → metrics.rs (counters, gauges, histograms via the `metrics` facade)
//!     → tracing.rs (endpoint naming for request spans)
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder on its own
//! - Every request span carries a request id
//! - Metric updates are no-ops until the application installs a recorder

pub mod logging;
pub mod metrics;
pub mod tracing;
