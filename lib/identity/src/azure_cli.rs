//! Sessions borrowed from an installed Azure CLI.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rootcause::Report;
use secrecy::SecretString;
use serde::Deserialize;
use speechkit_core::TenantId;
use std::process::Stdio;
use tracing::{debug, info, instrument};

use crate::error::IdentityError;
use crate::provider::SessionProvider;
use crate::session::{AzureSession, GetSessionOptions, normalize_scopes};

const PROVIDER_NAME: &str = "azure-cli";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliAccessToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
    #[serde(default)]
    tenant: Option<String>,
}

/// Parses the JSON printed by `az account get-access-token`.
fn parse_token_output(
    stdout: &[u8],
    scopes: Vec<String>,
) -> Result<AzureSession, Report<IdentityError>> {
    let token: CliAccessToken =
        serde_json::from_slice(stdout).map_err(|e| IdentityError::ProviderError {
            provider: PROVIDER_NAME.to_string(),
            reason: format!("unexpected get-access-token output: {e}"),
        })?;
    let expires_at = token
        .expires_on
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or_else(|| Utc::now() + TimeDelta::hours(1));
    Ok(AzureSession::new(
        token.tenant.map(TenantId::from),
        scopes,
        SecretString::from(token.access_token),
        expires_at,
    ))
}

/// Session provider that shells out to `az`.
///
/// Silent lookups call `az account get-access-token`; an interactive
/// sign-in runs `az login --use-device-code` attached to the terminal.
#[derive(Debug, Clone)]
pub struct AzureCliSessionProvider {
    program: String,
}

impl Default for AzureCliSessionProvider {
    fn default() -> Self {
        Self::new("az")
    }
}

impl AzureCliSessionProvider {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Asks `az` for a token; `None` when it has no usable sign-in.
    async fn access_token(
        &self,
        scopes: &[String],
        tenant_id: Option<&TenantId>,
    ) -> Result<Option<AzureSession>, Report<IdentityError>> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(["account", "get-access-token", "--output", "json", "--scope"])
            .arg(&scopes[0])
            .stdin(Stdio::null());
        if let Some(tenant) = tenant_id {
            command.args(["--tenant", tenant.as_str()]);
        }

        let output = command.output().await.map_err(|e| self.spawn_error(&e))?;
        if !output.status.success() {
            debug!(status = ?output.status, "az has no usable session");
            return Ok(None);
        }
        parse_token_output(&output.stdout, scopes.to_vec()).map(Some)
    }

    fn spawn_error(&self, e: &std::io::Error) -> IdentityError {
        IdentityError::Configuration {
            reason: format!("cannot run '{}': {e}", self.program),
        }
    }
}

#[async_trait]
impl SessionProvider for AzureCliSessionProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    #[instrument(skip(self, scopes), fields(tenant = tenant_id.map(TenantId::as_str)))]
    async fn get_session(
        &self,
        scopes: &[String],
        tenant_id: Option<&TenantId>,
        options: GetSessionOptions,
    ) -> Result<Option<AzureSession>, Report<IdentityError>> {
        let scopes = normalize_scopes(scopes);
        if let Some(session) = self.access_token(&scopes, tenant_id).await? {
            return Ok(Some(session));
        }
        if options.silent || !options.create_if_none {
            return Ok(None);
        }

        let mut login = tokio::process::Command::new(&self.program);
        login.args(["login", "--use-device-code"]);
        if let Some(tenant) = tenant_id {
            login.args(["--tenant", tenant.as_str()]);
        }
        let status = login.status().await.map_err(|e| self.spawn_error(&e))?;
        if !status.success() {
            return Err(IdentityError::ProviderError {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("az login exited with {status}"),
            }
            .into());
        }
        info!("az login completed");

        self.access_token(&scopes, tenant_id).await
    }

    async fn sign_out(&self) -> Result<(), Report<IdentityError>> {
        // The CLI's own sign-in belongs to the user; nothing is cached here.
        info!("leaving the Azure CLI sign-in untouched; run 'az logout' to end it");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn parses_cli_token_output() {
        let json = br#"{
            "accessToken": "opaque",
            "expiresOn": "2030-01-01 00:00:00.000000",
            "expires_on": 1893456000,
            "subscription": "s1",
            "tenant": "t1",
            "tokenType": "Bearer"
        }"#;
        let session = parse_token_output(json, vec!["scope".to_string()]).expect("parse");
        assert_eq!(session.access_token().expose_secret(), "opaque");
        assert_eq!(session.tenant_id(), Some(&TenantId::from("t1")));
        assert_eq!(session.expires_at().timestamp(), 1_893_456_000);
    }

    #[test]
    fn rejects_garbage_output() {
        let err = parse_token_output(b"ERROR: Please run 'az login'", Vec::new()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            IdentityError::ProviderError { .. }
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_configuration_error() {
        let provider = AzureCliSessionProvider::new("speechkit-test-no-such-az-binary");
        let err = provider
            .get_session(&[], None, GetSessionOptions::silent())
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            IdentityError::Configuration { .. }
        ));
    }
}
