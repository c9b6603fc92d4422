// src/utils/pacing.rs

//! Minimum-interval pacing for outbound calls.

use std::time::Duration;

use tokio::time::Instant;

/// Keeps consecutive calls at least `interval` apart.
///
/// The first call passes straight through; later calls sleep only for the
/// part of the interval that has not already elapsed.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Suspend until the next call is allowed, then mark it as taken.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            if !self.interval.is_zero() {
                tokio::time::sleep_until(last + self.interval).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
