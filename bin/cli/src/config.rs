//! Command-line configuration.
//!
//! Loaded via the `config` crate from `SPEECHKIT__*` environment variables,
//! e.g. `SPEECHKIT__IDENTITY__PROVIDER=azure_cli` or
//! `SPEECHKIT__PROJECT__ENV_FILE=.env.local`. Every setting has a default.

use serde::Deserialize;
use speechkit_arm::{ArmConfig, RetryPolicy};
use speechkit_envsync::ProjectLayout;
use speechkit_identity::IdentityConfig;
use std::time::Duration;

/// Configuration composed from the library configs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub arm: ArmConfig,

    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    /// Where credentials go inside a project.
    #[serde(default)]
    pub project: ProjectLayout,
}

/// Waiting for freshly created resource groups.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_rg_poll_attempts")]
    pub rg_poll_attempts: u32,

    #[serde(default = "default_rg_poll_delay_seconds")]
    pub rg_poll_delay_seconds: u64,
}

fn default_rg_poll_attempts() -> u32 {
    5
}

fn default_rg_poll_delay_seconds() -> u64 {
    3
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            rg_poll_attempts: default_rg_poll_attempts(),
            rg_poll_delay_seconds: default_rg_poll_delay_seconds(),
        }
    }
}

impl ProvisioningConfig {
    #[must_use]
    pub fn resource_group_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.rg_poll_attempts,
            Duration::from_secs(self.rg_poll_delay_seconds),
        )
    }
}

impl CliConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::with_prefix("SPEECHKIT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
