//! Retry policy for retryable fetch failures
//!
//! Delays grow exponentially from `base_delay` by `factor`, are capped at
//! `max_delay`, and are optionally scaled by a random factor in `[0.5, 1.5)`
//! before the cap is applied again.

use crate::config::CrawlerConfig;
use std::time::Duration;

/// Backoff schedule and bound for one node's attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            ..Self::default()
        }
    }

    /// A policy with zero backoff, for tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
            jitter: false,
        }
    }

    /// Whether retry number `retry` (1-based) is still allowed
    pub fn should_retry(&self, retry: u32) -> bool {
        retry <= self.max_retries
    }

    /// Backoff to wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        let exponential = base_ms * self.factor.powi(exponent);
        let capped = if exponential.is_finite() {
            exponential.min(max_ms)
        } else {
            max_ms
        };

        let delayed = if self.jitter {
            (capped * (0.5 + fastrand::f64())).min(max_ms)
        } else {
            capped
        };

        Duration::from_millis(delayed.max(0.0) as u64)
    }
}
