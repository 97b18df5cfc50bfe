//! Randomized delay between outbound fetches

use crate::config::PacerConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Chooses how long to wait before the next fetch
pub trait Pacer: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Uniform delay in `[min, max]`
#[derive(Debug, Clone)]
pub struct JitterPacer {
    min: Duration,
    max: Duration,
}

impl JitterPacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_config(config: &PacerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

impl Pacer for JitterPacer {
    fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

/// Never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Sleeps for `delay` unless `cancel` fires first
///
/// Returns false when the wait was cut short by cancellation.
pub async fn wait_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
