//! Error types for the ARM crate.

use speechkit_identity::IdentityError;
use std::fmt;

/// Errors from Azure Resource Manager calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmError {
    /// ARM answered with a non-success status.
    Status {
        status: u16,
        code: Option<String>,
        message: String,
        retry_after: Option<u64>,
    },
    /// The request never produced a response.
    Transport {
        reason: String,
        timeout: bool,
        connect: bool,
    },
    /// The response body did not match the expected shape.
    Deserialize { reason: String },
    /// No signed-in account could provide a token.
    NotSignedIn,
    /// Token acquisition failed for another reason.
    Authentication { reason: String },
    /// The location offers no SKU for the requested kind.
    NoPricingTierAvailable { location: String },
    /// A freshly created resource group never became visible.
    ResourceGroupNotReady { name: String, attempts: u32 },
    /// A resource id lacks the segments the call needs.
    InvalidResourceId { id: String },
    /// Keys or location could not be read from the instance.
    MissingKeyOrRegion { name: String },
    /// Account creation ended in a state other than `Succeeded`.
    ProvisioningFailed { name: String, state: String },
    /// Client settings are unusable.
    Configuration { reason: String },
}

impl ArmError {
    /// Short stable name used in error codes.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "HttpStatus",
            Self::Transport { .. } => "Transport",
            Self::Deserialize { .. } => "Deserialize",
            Self::NotSignedIn => "NotSignedIn",
            Self::Authentication { .. } => "Authentication",
            Self::NoPricingTierAvailable { .. } => "NoPricingTierAvailable",
            Self::ResourceGroupNotReady { .. } => "ResourceGroupNotReady",
            Self::InvalidResourceId { .. } => "InvalidResourceId",
            Self::MissingKeyOrRegion { .. } => "MissingKeyOrRegion",
            Self::ProvisioningFailed { .. } => "ProvisioningFailed",
            Self::Configuration { .. } => "Configuration",
        }
    }

    /// HTTP status of a rejected call, if that is what this is.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Seconds to wait before retrying, or `None` when retrying is pointless.
    ///
    /// Throttling and server errors honour `Retry-After`; timeouts and
    /// connection failures back off exponentially.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Option<u64> {
        let backoff = 2_u64.saturating_pow(attempt.min(5));
        match self {
            Self::Status {
                status,
                retry_after,
                ..
            } if *status == 429 || (500..600).contains(status) => {
                Some(retry_after.unwrap_or(backoff))
            }
            Self::Transport {
                timeout, connect, ..
            } if *timeout || *connect => Some(backoff),
            _ => None,
        }
    }
}

impl From<&IdentityError> for ArmError {
    fn from(err: &IdentityError) -> Self {
        match err {
            IdentityError::NotSignedIn => Self::NotSignedIn,
            other => Self::Authentication {
                reason: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ArmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Deserialize {
                reason: err.to_string(),
            };
        }
        Self::Transport {
            reason: err.to_string(),
            timeout: err.is_timeout(),
            connect: err.is_connect(),
        }
    }
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status {
                status,
                code,
                message,
                ..
            } => match code {
                Some(code) => write!(f, "ARM request failed ({status} {code}): {message}"),
                None => write!(f, "ARM request failed ({status}): {message}"),
            },
            Self::Transport { reason, .. } => write!(f, "ARM request failed: {reason}"),
            Self::Deserialize { reason } => write!(f, "unexpected ARM response: {reason}"),
            Self::NotSignedIn => write!(f, "not signed in to Azure"),
            Self::Authentication { reason } => write!(f, "could not get an ARM token: {reason}"),
            Self::NoPricingTierAvailable { location } => {
                write!(f, "No pricing tier available for the selected region {location}")
            }
            Self::ResourceGroupNotReady { name, attempts } => write!(
                f,
                "resource group '{name}' was not visible after {attempts} attempts"
            ),
            Self::InvalidResourceId { id } => write!(f, "invalid resource id: {id}"),
            Self::MissingKeyOrRegion { name } => {
                write!(f, "could not read the key or region of '{name}'")
            }
            Self::ProvisioningFailed { name, state } => {
                write!(f, "provisioning of '{name}' ended in state {state}")
            }
            Self::Configuration { reason } => write!(f, "invalid ARM configuration: {reason}"),
        }
    }
}

impl std::error::Error for ArmError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, retry_after: Option<u64>) -> ArmError {
        ArmError::Status {
            status,
            code: None,
            message: String::new(),
            retry_after,
        }
    }

    #[test]
    fn throttling_honours_retry_after() {
        assert_eq!(status(429, Some(7)).retry_delay(1), Some(7));
        assert_eq!(status(503, None).retry_delay(2), Some(4));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(status(500, None).retry_delay(9), Some(32));
    }

    #[test]
    fn client_errors_are_not_retried() {
        assert_eq!(status(404, None).retry_delay(1), None);
        assert_eq!(status(403, None).retry_delay(1), None);
        assert_eq!(
            ArmError::Deserialize {
                reason: "x".to_string()
            }
            .retry_delay(1),
            None
        );
    }

    #[test]
    fn transport_retry_needs_timeout_or_connect() {
        let reset = ArmError::Transport {
            reason: "reset".to_string(),
            timeout: false,
            connect: false,
        };
        assert_eq!(reset.retry_delay(1), None);
        let timeout = ArmError::Transport {
            reason: "timed out".to_string(),
            timeout: true,
            connect: false,
        };
        assert_eq!(timeout.retry_delay(1), Some(2));
    }

    #[test]
    fn identity_errors_map_to_sign_in_state() {
        assert_eq!(ArmError::from(&IdentityError::NotSignedIn), ArmError::NotSignedIn);
        assert!(matches!(
            ArmError::from(&IdentityError::LoginTimeout),
            ArmError::Authentication { .. }
        ));
    }

    #[test]
    fn pricing_tier_message() {
        let err = ArmError::NoPricingTierAvailable {
            location: "westus".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No pricing tier available for the selected region westus"
        );
    }
}
