//! Random selection strategy, optionally weighted.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};

use crate::pool::Connection;
use crate::selector::Selector;

/// Uniform or weight-proportional random selector.
#[derive(Debug, Default)]
pub struct Random {
    weighted: bool,
}

impl Random {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick proportionally to each connection's configured weight.
    pub fn weighted() -> Self {
        Self { weighted: true }
    }
}

impl Selector for Random {
    fn select(&self, candidates: &[Arc<Connection>]) -> Option<Arc<Connection>> {
        if candidates.is_empty() {
            return None;
        }

        if self.weighted {
            // All-zero weights fall back to a uniform pick.
            if let Ok(dist) = WeightedIndex::new(candidates.iter().map(|c| c.weight())) {
                let index = dist.sample(&mut rand::thread_rng());
                return Some(candidates[index].clone());
            }
        }

        Some(candidates[fastrand::usize(..candidates.len())].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::hosts::HostConfig;

    fn connection(port: u16, weight: u32) -> Arc<Connection> {
        let mut host = HostConfig::new("127.0.0.1", port);
        host.weight = weight;
        Arc::new(Connection::new(&host).unwrap())
    }

    #[test]
    fn test_uniform_picks_from_candidates() {
        let selector = Random::new();
        let pool = vec![connection(9200, 1), connection(9201, 1), connection(9202, 1)];
        for _ in 0..50 {
            let picked = selector.select(&pool).unwrap();
            assert!(pool.iter().any(|c| c.id() == picked.id()));
        }
        assert!(selector.select(&[]).is_none());
    }

    #[test]
    fn test_weighted_respects_zero_weight() {
        let selector = Random::weighted();
        let pool = vec![connection(9200, 0), connection(9201, 3), connection(9202, 0)];
        for _ in 0..50 {
            assert_eq!(selector.select(&pool).unwrap().id().port, 9201);
        }
    }

    #[test]
    fn test_weighted_all_zero_falls_back() {
        let selector = Random::weighted();
        let pool = vec![connection(9200, 0), connection(9201, 0)];
        assert!(selector.select(&pool).is_some());
    }
}
