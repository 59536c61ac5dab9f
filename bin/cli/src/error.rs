//! Errors surfaced by the command-line front end.

use rootcause::Report;
use speechkit_arm::ArmError;
use speechkit_identity::IdentityError;
use speechkit_provisioning::ProvisioningError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Environment configuration could not be loaded.
    Config { reason: String },
    /// A client could not be constructed from the configuration.
    Setup { reason: String },
    /// The command itself failed or was cancelled.
    Provisioning(ProvisioningError),
}

impl CliError {
    pub fn config(err: &config::ConfigError) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }

    pub fn identity_setup(err: Report<IdentityError>) -> Self {
        Self::Setup {
            reason: err.current_context().to_string(),
        }
    }

    pub fn arm_setup(err: Report<ArmError>) -> Self {
        Self::Setup {
            reason: err.current_context().to_string(),
        }
    }

    pub fn provisioning(err: Report<ProvisioningError>) -> Self {
        Self::Provisioning(err.current_context().clone())
    }

    /// True when the user backed out; not reported as a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Provisioning(e) if e.is_cancellation())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Setup { reason } => write!(f, "cannot start: {reason}"),
            Self::Provisioning(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CliError {}
