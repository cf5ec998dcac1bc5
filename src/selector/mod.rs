//! Connection selection subsystem.
//!
//! # Data Flow
//! ```text
//! Transport attempt
//!     → pool.selection_candidates() (alive, or resurrect candidates)
//!     → Apply selection strategy:
//!         - round_robin.rs (rotate through candidates)
//!         - random.rs (uniform or weighted pick)
//!     → Connection handed to the adapter
//! ```
//!
//! # Design Decisions
//! - Selectors never touch health state; the pool owns it
//! - Strategy chosen per transport instance from config, or injected

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pool::Connection;

pub mod random;
pub mod round_robin;

pub use random::Random;
pub use round_robin::RoundRobin;

/// Strategy that picks one connection from a candidate list.
pub trait Selector: Send + Sync + Debug {
    /// Pick a connection. Returns `None` only for an empty list.
    fn select(&self, candidates: &[Arc<Connection>]) -> Option<Arc<Connection>>;
}

/// Built-in selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    #[default]
    RoundRobin,
    Random,
    WeightedRandom,
}

impl SelectorKind {
    pub fn build(self) -> Arc<dyn Selector> {
        match self {
            SelectorKind::RoundRobin => Arc::new(RoundRobin::new()),
            SelectorKind::Random => Arc::new(Random::new()),
            SelectorKind::WeightedRandom => Arc::new(Random::weighted()),
        }
    }
}
