//! Session provider seam.

use async_trait::async_trait;
use rootcause::Report;
use secrecy::SecretString;
use speechkit_core::TenantId;

use crate::error::IdentityError;
use crate::session::{AzureSession, GetSessionOptions};

/// Obtains and caches sessions for the signed-in identity.
///
/// With [`GetSessionOptions::silent`] implementations must return at once,
/// yielding `None` when no session can be produced without user interaction.
/// With `create_if_none` they may block until the user completes or abandons
/// an interactive sign-in. A declined consent is reported as
/// [`IdentityError::UserCancelled`].
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Returns a session for `scopes` (ARM when empty), optionally bound to `tenant_id`.
    async fn get_session(
        &self,
        scopes: &[String],
        tenant_id: Option<&TenantId>,
        options: GetSessionOptions,
    ) -> Result<Option<AzureSession>, Report<IdentityError>>;

    /// Forgets every cached session.
    async fn sign_out(&self) -> Result<(), Report<IdentityError>>;
}

/// Mints bearer tokens for management API calls.
///
/// Implementations must re-check that an account is still signed in on
/// every call rather than trusting an earlier answer.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn bearer_token(
        &self,
        tenant_id: Option<&TenantId>,
    ) -> Result<SecretString, Report<IdentityError>>;
}
