//! Bounded polling for eventually-consistent ARM writes.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often, and how patiently, to poll for a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    /// Multiplier applied to the delay after each attempt; 1 keeps it constant.
    backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(3))
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff_factor: 1,
        }
    }

    /// Default attempt budget with no waiting between attempts.
    #[must_use]
    pub fn immediate() -> Self {
        Self::new(Self::default().max_attempts, Duration::ZERO)
    }

    #[must_use]
    pub fn with_backoff(mut self, factor: u32) -> Self {
        self.backoff_factor = factor.max(1);
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1` (attempts count from 1).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_factor
            .saturating_pow(attempt.saturating_sub(1));
        self.delay.saturating_mul(factor)
    }

    /// Calls `probe` until it reports true or the attempts run out.
    ///
    /// Returns whether the condition was met. Errors from `probe` stop the
    /// polling immediately.
    pub async fn poll_until<F, Fut, E>(&self, mut probe: F) -> Result<bool, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        for attempt in 1..=self.max_attempts {
            if probe(attempt).await? {
                return Ok(true);
            }
            if attempt < self.max_attempts {
                let delay = self.delay_after(attempt);
                debug!(attempt, delay_ms = delay.as_millis(), "condition not met; polling again");
                tokio::time::sleep(delay).await;
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn defaults_match_resource_group_polling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_after(1), Duration::from_secs(3));
        assert_eq!(policy.delay_after(4), Duration::from_secs(3));
    }

    #[test]
    fn backoff_multiplies_delay() {
        let policy = RetryPolicy::new(4, Duration::from_secs(1)).with_backoff(2);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn poll_stops_on_success() {
        let calls = AtomicU32::new(0);
        let met = RetryPolicy::immediate()
            .poll_until(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ()>(attempt == 3) }
            })
            .await
            .expect("poll");
        assert!(met);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let met = RetryPolicy::immediate()
            .poll_until(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, ()>(false) }
            })
            .await
            .expect("poll");
        assert!(!met);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn poll_propagates_errors() {
        let result = RetryPolicy::immediate()
            .poll_until(|_| async { Err::<bool, _>("boom") })
            .await;
        assert_eq!(result, Err("boom"));
    }
}
