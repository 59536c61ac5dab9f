//! Microsoft Entra ID sign-in for speechkit.
//!
//! A [`SessionProvider`] mints access tokens (device-code grant or a borrowed
//! Azure CLI sign-in); the [`AccountManager`] wraps one provider as the
//! explicit session context that the ARM clients draw bearer tokens from.

pub mod account;
pub mod azure_cli;
pub mod config;
pub mod device_code;
pub mod error;
pub mod provider;
pub mod session;

use std::sync::Arc;

use rootcause::Report;

pub use account::{AccountManager, LoginState, LoginStatus, SIGN_IN_MESSAGE};
pub use azure_cli::AzureCliSessionProvider;
pub use config::{IdentityConfig, IdentityConfigBuilder, ProviderKind};
pub use device_code::{
    DeviceCodeNotifier, DeviceCodePrompt, DeviceCodeSessionProvider, TracingNotifier,
};
pub use error::IdentityError;
pub use provider::{SessionProvider, TokenCredential};
pub use session::{ARM_SCOPE, AccountClaims, AzureSession, GetSessionOptions};

/// Builds the session provider selected by `config`.
///
/// # Errors
///
/// Returns an error if the provider cannot be constructed.
pub fn session_provider(
    config: &IdentityConfig,
    notifier: Arc<dyn DeviceCodeNotifier>,
) -> Result<Arc<dyn SessionProvider>, Report<IdentityError>> {
    Ok(match config.provider() {
        ProviderKind::DeviceCode => {
            Arc::new(DeviceCodeSessionProvider::new(config.clone(), notifier)?)
        }
        ProviderKind::AzureCli => Arc::new(AzureCliSessionProvider::default()),
    })
}
