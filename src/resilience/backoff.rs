//! Resurrection backoff for dead connections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the resurrection delay reacts to repeated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Always wait `resurrect_after`.
    #[default]
    Fixed,
    /// Double the wait for every consecutive failure, up to a cap.
    Exponential,
}

/// Computes how long a dead connection stays out of rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResurrectBackoff {
    strategy: BackoffStrategy,
    base: Duration,
    max: Duration,
}

impl ResurrectBackoff {
    pub fn new(strategy: BackoffStrategy, base: Duration, max: Duration) -> Self {
        Self {
            strategy,
            base,
            max: max.max(base),
        }
    }

    pub fn fixed(base: Duration) -> Self {
        Self::new(BackoffStrategy::Fixed, base, base)
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::new(BackoffStrategy::Exponential, base, max)
    }

    /// Delay before a connection with `failures` recorded failures may be probed.
    pub fn delay(&self, failures: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Fixed => self.base,
            BackoffStrategy::Exponential => {
                let millis = calculate_backoff(
                    failures,
                    self.base.as_millis() as u64,
                    self.max.as_millis() as u64,
                );
                Duration::from_millis(millis)
            }
        }
    }
}

impl Default for ResurrectBackoff {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(60))
    }
}

/// Exponential delay in milliseconds: `base * 2^(failures - 1)`, capped at `max_ms`.
pub fn calculate_backoff(failures: u32, base_ms: u64, max_ms: u64) -> u64 {
    if failures == 0 {
        return 0;
    }

    let exponential_base = 2u64.saturating_pow(failures - 1);
    base_ms.saturating_mul(exponential_base).min(max_ms)
}
