//! ARM client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::throttle::ThrottleConfig;

/// Settings for talking to Azure Resource Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    /// Management endpoint, e.g. "https://management.azure.com".
    #[serde(default = "default_endpoint")]
    endpoint: String,
    /// Retries for throttled, failed-over or timed-out calls.
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    /// Client-side budget per subscription.
    #[serde(default = "default_requests_per_minute")]
    requests_per_minute: u32,
}

fn default_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_max_retries() -> u32 {
    4
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_requests_per_minute() -> u32 {
    100
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_retries: default_max_retries(),
            timeout_seconds: default_timeout_seconds(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl ArmConfig {
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig::per_minute(self.requests_per_minute.max(1))
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}
