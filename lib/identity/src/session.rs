//! Authentication sessions.
//!
//! A session is an access token bound to a scope set and, optionally, a
//! tenant. Sessions are kept in memory only; callers ask the provider again
//! whenever they need a token and the provider decides whether a cached
//! token is still good.

use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use rootcause::Report;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use speechkit_core::TenantId;

use crate::error::IdentityError;

/// Scope covering Azure Resource Manager.
pub const ARM_SCOPE: &str = "https://management.core.windows.net//.default";

/// Scope asking Entra ID for a refresh token.
pub const OFFLINE_ACCESS_SCOPE: &str = "offline_access";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECONDS: i64 = 120;

/// How hard `get_session` may try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetSessionOptions {
    /// Start an interactive sign-in when no session exists.
    pub create_if_none: bool,
    /// Never show UI; return `None` instead.
    pub silent: bool,
}

impl GetSessionOptions {
    /// Returns immediately; used for "is signed in" checks.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            create_if_none: false,
            silent: true,
        }
    }

    /// May block on the user completing an interactive sign-in.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            create_if_none: true,
            silent: false,
        }
    }
}

/// Deduplicates scopes, keeping their order, and defaults to [`ARM_SCOPE`].
#[must_use]
pub fn normalize_scopes(scopes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(scopes.len().max(1));
    for scope in scopes.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|s| s == scope) {
            out.push(scope.to_string());
        }
    }
    if out.is_empty() {
        out.push(ARM_SCOPE.to_string());
    }
    out
}

/// Claims describing the signed-in account, read from the access token.
///
/// The token is not verified here; these values are for display and
/// default naming only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountClaims {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub oid: Option<String>,
    #[serde(default)]
    pub tid: Option<String>,
}

impl AccountClaims {
    /// Decodes the payload segment of a JWT access token.
    pub fn from_access_token(token: &str) -> Result<Self, Report<IdentityError>> {
        // JWT is base64url(header).base64url(payload).signature
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(IdentityError::InvalidToken {
                reason: "not a JWT".to_string(),
            }
            .into());
        }

        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(parts[1].trim_end_matches('='))
            .map_err(|e| IdentityError::InvalidToken {
                reason: format!("payload is not base64url: {e}"),
            })?;

        Ok(
            serde_json::from_slice(&payload).map_err(|e| IdentityError::InvalidToken {
                reason: format!("payload is not JSON: {e}"),
            })?,
        )
    }

    /// Sign-in name: `email`, then `upn`, then `unique_name`.
    #[must_use]
    pub fn sign_in_name(&self) -> Option<&str> {
        [&self.email, &self.upn, &self.unique_name]
            .into_iter()
            .filter_map(|c| c.as_deref())
            .find(|s| !s.is_empty())
    }

    /// Local part of the sign-in name.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.sign_in_name()
            .and_then(|n| n.split('@').next())
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tid.as_deref().map(TenantId::from)
    }
}

/// An access token plus what it is good for.
#[derive(Debug, Clone)]
pub struct AzureSession {
    tenant_id: Option<TenantId>,
    scopes: Vec<String>,
    access_token: SecretString,
    expires_at: DateTime<Utc>,
    account: AccountClaims,
}

impl AzureSession {
    /// Creates a session, decoding the account claims from the token when possible.
    #[must_use]
    pub fn new(
        tenant_id: Option<TenantId>,
        scopes: Vec<String>,
        access_token: SecretString,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let account =
            AccountClaims::from_access_token(access_token.expose_secret()).unwrap_or_default();
        Self {
            tenant_id,
            scopes,
            access_token,
            expires_at,
            account,
        }
    }

    /// Replaces the decoded claims.
    #[must_use]
    pub fn with_account(mut self, account: AccountClaims) -> Self {
        self.account = account;
        self
    }

    /// Tenant the token was minted for, if one was requested.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn account(&self) -> &AccountClaims {
        &self.account
    }

    /// True once the token is within the refresh skew of its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() + TimeDelta::seconds(EXPIRY_SKEW_SECONDS) >= self.expires_at
    }
}
