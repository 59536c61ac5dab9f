//! Error taxonomy of the provisioning workflow.
//!
//! Lower crates keep their own enums; at this boundary they are folded into
//! [`ProvisioningError`] so callers can tell a cancellation from a domain
//! failure from a system failure, and report each with a stable code.

use rootcause::Report;
use speechkit_arm::ArmError;
use speechkit_core::PromptError;
use speechkit_envsync::EnvSyncError;
use speechkit_identity::IdentityError;
use std::fmt;

/// Who has to act on a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Expected failure with a remediation the user can apply.
    User,
    /// Unexpected failure of the network, a provider or the machine.
    System,
}

impl ErrorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from resolving and provisioning a speech resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    /// The user cancelled a prompt.
    UserCancelled,
    /// The account can see no subscription at all.
    NoSubscriptionFound,
    /// A subscription id outside the account's list was requested.
    UnknownSubscription { id: String },
    /// A resource is not one of the speech-capable account kinds.
    InvalidResourceType { kind: String },
    Identity(IdentityError),
    Arm(ArmError),
    EnvSync(EnvSyncError),
    Prompt(PromptError),
}

impl ProvisioningError {
    pub(crate) fn identity(err: Report<IdentityError>) -> Self {
        match err.current_context() {
            IdentityError::UserCancelled => Self::UserCancelled,
            other => Self::Identity(other.clone()),
        }
    }

    pub(crate) fn arm(err: Report<ArmError>) -> Self {
        Self::Arm(err.current_context().clone())
    }

    pub(crate) fn envsync(err: Report<EnvSyncError>) -> Self {
        Self::EnvSync(err.current_context().clone())
    }

    pub(crate) fn prompt(err: Report<PromptError>) -> Self {
        Self::Prompt(err.current_context().clone())
    }

    /// Short stable name, without the source prefix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserCancelled => "UserCancel",
            Self::NoSubscriptionFound => "NoSubscriptionFound",
            Self::UnknownSubscription { .. } => "UnknownSubscription",
            Self::InvalidResourceType { .. } => "InvalidResourceType",
            Self::Identity(e) => e.name(),
            Self::Arm(e) => e.name(),
            Self::EnvSync(e) => e.name(),
            Self::Prompt(e) => match e {
                PromptError::Io { .. } => "PromptIo",
                PromptError::EmptyOptions { .. } => "EmptySelectOption",
                PromptError::InvalidAnswer { .. } => "InvalidAnswer",
            },
        }
    }

    /// Component the failure originated in.
    #[must_use]
    pub const fn source_name(&self) -> &'static str {
        match self {
            Self::UserCancelled
            | Self::NoSubscriptionFound
            | Self::UnknownSubscription { .. }
            | Self::InvalidResourceType { .. } => "provisioning",
            Self::Identity(_) => "identity",
            Self::Arm(_) => "arm",
            Self::EnvSync(_) => "envsync",
            Self::Prompt(_) => "prompt",
        }
    }

    /// `source.name`, e.g. `arm.NoPricingTierAvailable`.
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}.{}", self.source_name(), self.name())
    }

    #[must_use]
    pub const fn error_type(&self) -> ErrorType {
        match self {
            Self::UserCancelled
            | Self::NoSubscriptionFound
            | Self::UnknownSubscription { .. }
            | Self::InvalidResourceType { .. }
            | Self::Identity(
                IdentityError::UserCancelled
                | IdentityError::LoginTimeout
                | IdentityError::NotSignedIn,
            )
            | Self::Arm(
                ArmError::NotSignedIn
                | ArmError::NoPricingTierAvailable { .. }
                | ArmError::MissingKeyOrRegion { .. }
                | ArmError::InvalidResourceId { .. },
            ) => ErrorType::User,
            _ => ErrorType::System,
        }
    }

    /// True for a user-initiated abort, which is never shown as an error.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::UserCancelled | Self::Identity(IdentityError::UserCancelled)
        )
    }
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserCancelled => write!(f, "User canceled."),
            Self::NoSubscriptionFound => write!(f, "We couldn't find a subscription."),
            Self::UnknownSubscription { .. } => write!(
                f,
                "We're unable to set this subscription. Select a subscription you have access to."
            ),
            Self::InvalidResourceType { kind } => {
                write!(f, "'{kind}' resources cannot serve speech requests")
            }
            Self::Identity(e) => e.fmt(f),
            Self::Arm(e) => e.fmt(f),
            Self::EnvSync(e) => e.fmt(f),
            Self::Prompt(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ProvisioningError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_carry_their_source() {
        assert_eq!(
            ProvisioningError::NoSubscriptionFound.error_code(),
            "provisioning.NoSubscriptionFound"
        );
        let err = ProvisioningError::Arm(ArmError::NoPricingTierAvailable {
            location: "eastus".to_string(),
        });
        assert_eq!(err.error_code(), "arm.NoPricingTierAvailable");
        assert_eq!(err.error_type(), ErrorType::User);
        assert_eq!(
            err.to_string(),
            "No pricing tier available for the selected region eastus"
        );
    }

    #[test]
    fn transport_failures_are_system_errors() {
        let err = ProvisioningError::Arm(ArmError::Transport {
            reason: "connection reset".to_string(),
            timeout: false,
            connect: true,
        });
        assert_eq!(err.error_type(), ErrorType::System);
        assert_eq!(err.error_type().as_str(), "system");
    }

    #[test]
    fn identity_cancellation_folds_into_user_cancelled() {
        let err = ProvisioningError::identity(IdentityError::UserCancelled.into());
        assert_eq!(err, ProvisioningError::UserCancelled);
        assert!(err.is_cancellation());
        assert!(!ProvisioningError::NoSubscriptionFound.is_cancellation());
    }

    #[test]
    fn login_timeout_is_a_user_error() {
        let err = ProvisioningError::identity(IdentityError::LoginTimeout.into());
        assert_eq!(err.error_code(), "identity.LoginTimeout");
        assert_eq!(err.error_type(), ErrorType::User);
    }
}
