//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Transport::spawn_sniffer(shutdown.subscribe())
//!     → periodic sniff ticks
//!     → Shutdown::trigger() → task exits after the current tick
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
