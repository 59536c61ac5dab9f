//! Error types for the identity crate.

use std::fmt;

/// Errors from sign-in, sign-out and token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The user declined the sign-in (or sign-out) confirmation or consent.
    UserCancelled,
    /// The identity provider did not complete sign-in before the code expired.
    LoginTimeout,
    /// An operation that needs a signed-in account ran without one.
    NotSignedIn,
    /// The identity provider rejected the request or was unreachable.
    ProviderError { provider: String, reason: String },
    /// A token could not be decoded.
    InvalidToken { reason: String },
    /// Identity settings are unusable (bad URL, unknown provider).
    Configuration { reason: String },
    /// The confirmation prompt itself failed.
    Prompt { reason: String },
}

impl IdentityError {
    /// Short stable name used in error codes.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserCancelled => "UserCancel",
            Self::LoginTimeout => "LoginTimeout",
            Self::NotSignedIn => "NotSignedIn",
            Self::ProviderError { .. } => "ProviderError",
            Self::InvalidToken { .. } => "InvalidToken",
            Self::Configuration { .. } => "Configuration",
            Self::Prompt { .. } => "Prompt",
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserCancelled => write!(f, "User canceled."),
            Self::LoginTimeout => write!(f, "Login took too long. Please try again."),
            Self::NotSignedIn => write!(f, "not signed in to Azure"),
            Self::ProviderError { provider, reason } => {
                write!(f, "identity provider '{provider}' error: {reason}")
            }
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::Configuration { reason } => {
                write!(f, "invalid identity configuration: {reason}")
            }
            Self::Prompt { reason } => write!(f, "confirmation prompt failed: {reason}"),
        }
    }
}

impl std::error::Error for IdentityError {}
