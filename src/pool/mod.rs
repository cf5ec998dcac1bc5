//! Connection pool subsystem.
//!
//! # Data Flow
//! ```text
//! hosts (config) / sniffed topology
//!     → collection.rs (ConnectionPool: ordered membership, reconciliation)
//!     → connection.rs (per-node health: alive / dead / resurrect-candidate)
//!     → selector picks from pool.selection_candidates()
//!     → transport reports outcome → mark_dead / mark_alive
//! ```
//!
//! # Design Decisions
//! - Pool owns only node metadata, never sockets (those belong to the adapter)
//! - Membership reads are lock-free snapshots; health updates take a
//!   per-connection lock that is never held across a network call
//! - Nodes leave the pool only through reconciliation or explicit removal
//! - Failure history survives resurrection

pub mod collection;
pub mod connection;

pub use collection::{ConnectionPool, ReconcilePolicy, ReconcileReport};
pub use connection::{Connection, ConnectionId, HealthSnapshot, HealthState};
