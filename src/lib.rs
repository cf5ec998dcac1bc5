//! Client-side transport for a cluster of interchangeable HTTP nodes.
//!
//! Keeps a pool of known nodes, picks one per attempt, quarantines nodes that
//! fail, retries on alternates and can rediscover the cluster topology.

pub mod adapter;
pub mod compression;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod resilience;
pub mod selector;
pub mod serializer;
pub mod sniffer;
pub mod transport;

pub use adapter::{Adapter, AdapterError, AdapterRequest, Response};
pub use config::TransportConfig;
pub use error::TransportError;
pub use lifecycle::Shutdown;
pub use pool::{Connection, ConnectionPool, HealthState};
pub use selector::Selector;
pub use transport::{Body, Request, RequestOptions, Transport, TransportBuilder};
