//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) / TransportConfig::with_hosts
//!     → loader.rs (parse & deserialize)
//!     → hosts.rs (normalize host seeds, env fallback)
//!     → validation.rs (semantic checks)
//!     → TransportConfig (validated, immutable)
//!     → consumed once by Transport::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a transport is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod hosts;
pub mod loader;
pub mod schema;
pub mod validation;

pub use hosts::HostConfig;
pub use loader::ConfigError;
pub use schema::TransportConfig;
