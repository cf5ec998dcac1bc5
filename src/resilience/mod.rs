//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt finished:
//!     → retries.rs (classify outcome: success / retryable / fatal)
//!     → On retryable: pool marks node dead
//!         → backoff.rs (when may the node be probed again)
//!     → Transport re-selects a node for the next attempt
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt and sniff has a deadline
//! - Retries rotate across nodes instead of hammering one
//! - Dead nodes come back through resurrection, not a health-check thread

pub mod backoff;
pub mod retries;
