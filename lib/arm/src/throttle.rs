//! Client-side request throttling.
//!
//! ARM enforces per-subscription read and write quotas. The throttle keeps
//! each subscription (and the tenant-level directory calls) inside a fixed
//! window budget and makes callers wait out an exhausted window instead of
//! collecting 429s.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Request budget per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    pub max_requests: u32,
    pub window_seconds: u32,
}

impl ThrottleConfig {
    #[must_use]
    pub fn new(max_requests: u32, window_seconds: u32) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }

    fn window(self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.window_seconds))
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::per_minute(100)
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Exceeded { resets_at: DateTime<Utc> },
}

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Fixed-window throttle keyed by subscription.
#[derive(Debug, Clone, Default)]
pub struct RequestThrottle {
    config: ThrottleConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RequestThrottle {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn config(&self) -> ThrottleConfig {
        self.config
    }

    /// Counts a request against `key` if its window has room.
    pub fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> Admission {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            started_at: now,
        });

        if now - window.started_at >= self.config.window() {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.config.max_requests {
            return Admission::Exceeded {
                resets_at: window.started_at + self.config.window(),
            };
        }

        window.count += 1;
        Admission::Allowed {
            remaining: self.config.max_requests - window.count,
        }
    }

    /// Waits until `key` may send another request, then counts it.
    pub async fn acquire(&self, key: &str) {
        loop {
            let now = Utc::now();
            match self.try_acquire(key, now) {
                Admission::Allowed { .. } => return,
                Admission::Exceeded { resets_at } => {
                    let wait = (resets_at - now).to_std().unwrap_or_default();
                    debug!(key, wait_ms = wait.as_millis(), "request budget exhausted; waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Throttle key for an ARM path: the subscription id, or "tenant".
#[must_use]
pub fn throttle_key(path: &str) -> &str {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some(s), Some(id)) if s.eq_ignore_ascii_case("subscriptions") && !id.is_empty() => {
            id.split('?').next().unwrap_or(id)
        }
        _ => "tenant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_budget() {
        let throttle = RequestThrottle::new(ThrottleConfig::new(3, 60));
        let now = Utc::now();
        for expected in [2, 1, 0] {
            assert_eq!(
                throttle.try_acquire("s1", now),
                Admission::Allowed {
                    remaining: expected
                }
            );
        }
        assert!(matches!(
            throttle.try_acquire("s1", now),
            Admission::Exceeded { .. }
        ));
    }

    #[test]
    fn keys_are_isolated() {
        let throttle = RequestThrottle::new(ThrottleConfig::new(1, 60));
        let now = Utc::now();
        throttle.try_acquire("s1", now);
        assert!(matches!(
            throttle.try_acquire("s2", now),
            Admission::Allowed { .. }
        ));
    }

    #[test]
    fn window_rolls_over() {
        let throttle = RequestThrottle::new(ThrottleConfig::new(1, 60));
        let now = Utc::now();
        throttle.try_acquire("s1", now);
        assert!(matches!(
            throttle.try_acquire("s1", now + TimeDelta::seconds(61)),
            Admission::Allowed { remaining: 0 }
        ));
    }

    #[test]
    fn keys_follow_subscription_segment() {
        assert_eq!(
            throttle_key("/subscriptions/abc/resourcegroups/rg?api-version=1"),
            "abc"
        );
        assert_eq!(throttle_key("/subscriptions/abc?api-version=1"), "abc");
        assert_eq!(throttle_key("/tenants?api-version=2022-12-01"), "tenant");
    }
}
