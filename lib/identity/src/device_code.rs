//! Device-code sign-in against Microsoft Entra ID.
//!
//! The first interactive `get_session` runs the OAuth 2.0 device
//! authorization grant. The refresh token it yields is kept in memory and
//! redeemed per tenant to mint tenant-scoped access tokens silently, so one
//! sign-in covers every tenant the account can reach.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthType, ClientId, DeviceAuthorizationUrl, DeviceCodeErrorResponse,
    DeviceCodeErrorResponseType, EndpointNotSet, EndpointSet, RefreshToken, RequestTokenError,
    Scope, StandardDeviceAuthorizationResponse, TokenResponse, TokenUrl,
};
use rootcause::Report;
use secrecy::{ExposeSecret, SecretString};
use speechkit_core::TenantId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::provider::SessionProvider;
use crate::session::{AzureSession, GetSessionOptions, OFFLINE_ACCESS_SCOPE, normalize_scopes};

const PROVIDER_NAME: &str = "entra-device-code";

type DeviceClient =
    BasicClient<EndpointNotSet, EndpointSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// What the user needs to finish a device-code sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCodePrompt {
    pub verification_uri: String,
    pub user_code: String,
    pub expires_in: Duration,
}

/// Shows the device code to the user.
pub trait DeviceCodeNotifier: Send + Sync {
    fn notify(&self, prompt: &DeviceCodePrompt);
}

/// Notifier that writes the code to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl DeviceCodeNotifier for TracingNotifier {
    fn notify(&self, prompt: &DeviceCodePrompt) {
        info!(
            verification_uri = %prompt.verification_uri,
            user_code = %prompt.user_code,
            "open the verification page and enter the code to sign in"
        );
    }
}

#[derive(Default)]
struct TokenCache {
    refresh_token: Option<SecretString>,
    home_tenant: Option<TenantId>,
    sessions: HashMap<String, AzureSession>,
}

impl TokenCache {
    fn store(
        &mut self,
        tenant_id: Option<&TenantId>,
        scopes: Vec<String>,
        token: &BasicTokenResponse,
    ) -> AzureSession {
        if let Some(refresh) = token.refresh_token() {
            self.refresh_token = Some(SecretString::from(refresh.secret().clone()));
        }
        let lifetime = token
            .expires_in()
            .and_then(|d| TimeDelta::from_std(d).ok())
            .unwrap_or_else(|| TimeDelta::hours(1));
        let session = AzureSession::new(
            tenant_id.cloned(),
            scopes,
            SecretString::from(token.access_token().secret().clone()),
            Utc::now() + lifetime,
        );
        if self.home_tenant.is_none() {
            self.home_tenant = session.account().tenant_id();
        }
        self.sessions
            .insert(cache_key(tenant_id, session.scopes()), session.clone());
        session
    }
}

fn cache_key(tenant_id: Option<&TenantId>, scopes: &[String]) -> String {
    format!(
        "{}|{}",
        tenant_id.map_or("", TenantId::as_str),
        scopes.join(" ")
    )
}

/// Maps a failed device-token poll onto the identity taxonomy.
fn classify_device_error<RE>(err: &RequestTokenError<RE, DeviceCodeErrorResponse>) -> IdentityError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(resp) => match resp.error() {
            DeviceCodeErrorResponseType::AccessDenied => IdentityError::UserCancelled,
            DeviceCodeErrorResponseType::ExpiredToken => IdentityError::LoginTimeout,
            DeviceCodeErrorResponseType::Basic(BasicErrorResponseType::Extension(code))
                if code == "authorization_declined" =>
            {
                IdentityError::UserCancelled
            }
            _ => provider_error(resp.to_string()),
        },
        other => provider_error(other.to_string()),
    }
}

fn provider_error(reason: String) -> IdentityError {
    IdentityError::ProviderError {
        provider: PROVIDER_NAME.to_string(),
        reason,
    }
}

/// Session provider backed by the device authorization grant.
pub struct DeviceCodeSessionProvider {
    config: IdentityConfig,
    http: reqwest::Client,
    notifier: Arc<dyn DeviceCodeNotifier>,
    cache: Mutex<TokenCache>,
}

impl DeviceCodeSessionProvider {
    /// Creates a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: IdentityConfig,
        notifier: Arc<dyn DeviceCodeNotifier>,
    ) -> Result<Self, Report<IdentityError>> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| IdentityError::Configuration {
                reason: format!("HTTP client error: {e}"),
            })?;
        Ok(Self {
            config,
            http,
            notifier,
            cache: Mutex::new(TokenCache::default()),
        })
    }

    fn client(&self, tenant: &str) -> Result<DeviceClient, Report<IdentityError>> {
        let device_url = DeviceAuthorizationUrl::new(self.config.device_code_url(tenant))
            .map_err(|e| IdentityError::Configuration {
                reason: format!("invalid device code URL: {e}"),
            })?;
        let token_url =
            TokenUrl::new(self.config.token_url(tenant)).map_err(|e| IdentityError::Configuration {
                reason: format!("invalid token URL: {e}"),
            })?;

        Ok(BasicClient::new(ClientId::new(self.config.client_id().to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_device_authorization_url(device_url)
            .set_token_uri(token_url))
    }

    async fn device_code_sign_in(
        &self,
        tenant: &str,
        scopes: &[String],
    ) -> Result<BasicTokenResponse, Report<IdentityError>> {
        let client = self.client(tenant)?;

        let details: StandardDeviceAuthorizationResponse = client
            .exchange_device_code()
            .add_scopes(scopes.iter().map(|s| Scope::new(s.clone())))
            .add_scope(Scope::new(OFFLINE_ACCESS_SCOPE.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| provider_error(format!("device authorization failed: {e}")))?;

        self.notifier.notify(&DeviceCodePrompt {
            verification_uri: details.verification_uri().to_string(),
            user_code: details.user_code().secret().clone(),
            expires_in: details.expires_in(),
        });

        client
            .exchange_device_access_token(&details)
            .request_async(&self.http, tokio::time::sleep, Some(self.config.login_timeout()))
            .await
            .map_err(|e| classify_device_error(&e).into())
    }

    /// Redeems the refresh token for `tenant`.
    ///
    /// A rejection by the server (consent or MFA required for that tenant)
    /// yields `None`; transport failures are errors.
    async fn redeem_refresh_token(
        &self,
        tenant: &str,
        refresh_token: &SecretString,
        scopes: &[String],
    ) -> Result<Option<BasicTokenResponse>, Report<IdentityError>> {
        let client = self.client(tenant)?;
        let refresh = RefreshToken::new(refresh_token.expose_secret().to_string());
        match client
            .exchange_refresh_token(&refresh)
            .add_scopes(scopes.iter().map(|s| Scope::new(s.clone())))
            .request_async(&self.http)
            .await
        {
            Ok(token) => Ok(Some(token)),
            Err(RequestTokenError::ServerResponse(resp)) => {
                warn!(tenant, error = %resp, "silent token refresh rejected");
                Ok(None)
            }
            Err(e) => Err(provider_error(format!("token refresh failed: {e}")).into()),
        }
    }
}

#[async_trait]
impl SessionProvider for DeviceCodeSessionProvider {
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
        let mut cache = self.cache.lock().await;

        if let Some(session) = cache
            .sessions
            .get(&cache_key(tenant_id, &scopes))
            .filter(|s| !s.is_expired())
        {
            return Ok(Some(session.clone()));
        }

        if let Some(refresh_token) = cache.refresh_token.clone() {
            let tenant = tenant_id
                .or(cache.home_tenant.as_ref())
                .map_or_else(|| self.config.tenant().to_string(), ToString::to_string);
            if let Some(token) = self
                .redeem_refresh_token(&tenant, &refresh_token, &scopes)
                .await?
            {
                debug!("session minted from refresh token");
                return Ok(Some(cache.store(tenant_id, scopes, &token)));
            }
        }

        if options.silent || !options.create_if_none {
            return Ok(None);
        }
        // Silent lookups must not wait on the user finishing the device flow.
        drop(cache);

        let tenant = tenant_id.map_or_else(|| self.config.tenant().to_string(), ToString::to_string);
        let token = self.device_code_sign_in(&tenant, &scopes).await?;
        info!("device code sign-in completed");
        Ok(Some(self.cache.lock().await.store(tenant_id, scopes, &token)))
    }

    async fn sign_out(&self) -> Result<(), Report<IdentityError>> {
        let mut cache = self.cache.lock().await;
        *cache = TokenCache::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2::StandardErrorResponse;

    fn server_error(kind: DeviceCodeErrorResponseType) -> RequestTokenError<std::io::Error, DeviceCodeErrorResponse> {
        RequestTokenError::ServerResponse(StandardErrorResponse::new(kind, None, None))
    }

    #[test]
    fn declined_consent_is_cancellation() {
        assert_eq!(
            classify_device_error(&server_error(DeviceCodeErrorResponseType::AccessDenied)),
            IdentityError::UserCancelled
        );
        assert_eq!(
            classify_device_error(&server_error(DeviceCodeErrorResponseType::Basic(
                BasicErrorResponseType::Extension("authorization_declined".to_string())
            ))),
            IdentityError::UserCancelled
        );
    }

    #[test]
    fn expired_code_is_timeout() {
        assert_eq!(
            classify_device_error(&server_error(DeviceCodeErrorResponseType::ExpiredToken)),
            IdentityError::LoginTimeout
        );
    }

    #[test]
    fn other_failures_are_provider_errors() {
        let err = classify_device_error(&server_error(DeviceCodeErrorResponseType::Basic(
            BasicErrorResponseType::InvalidClient,
        )));
        assert!(matches!(err, IdentityError::ProviderError { .. }));

        let transport: RequestTokenError<std::io::Error, DeviceCodeErrorResponse> =
            RequestTokenError::Request(std::io::Error::other("connection reset"));
        assert!(matches!(
            classify_device_error(&transport),
            IdentityError::ProviderError { .. }
        ));
    }

    #[test]
    fn cache_key_separates_tenants() {
        let scopes = vec!["s".to_string()];
        let t1 = TenantId::from("t1");
        assert_ne!(cache_key(Some(&t1), &scopes), cache_key(None, &scopes));
    }

    #[tokio::test]
    async fn silent_lookup_without_sign_in_returns_none() {
        let provider =
            DeviceCodeSessionProvider::new(IdentityConfig::default(), Arc::new(TracingNotifier))
                .expect("provider");
        let session = provider
            .get_session(&[], None, GetSessionOptions::silent())
            .await
            .expect("silent lookup");
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn silent_lookup_is_not_blocked_by_pending_sign_in() {
        let mut server = mockito::Server::new_async().await;
        let _device = server
            .mock("POST", mockito::Matcher::Regex(r"/oauth2/v2\.0/devicecode$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"device_code":"dc","user_code":"ABC-123","verification_uri":"https://microsoft.com/devicelogin","expires_in":900,"interval":1}"#,
            )
            .create_async()
            .await;
        let _token = server
            .mock("POST", mockito::Matcher::Regex(r"/oauth2/v2\.0/token$".into()))
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"authorization_pending"}"#)
            .expect_at_least(0)
            .create_async()
            .await;

        let config = IdentityConfig::builder()
            .authority_host(server.url())
            .login_timeout_seconds(30)
            .build();
        let provider = Arc::new(
            DeviceCodeSessionProvider::new(config, Arc::new(TracingNotifier)).expect("provider"),
        );

        let interactive = tokio::spawn({
            let provider = provider.clone();
            async move {
                provider
                    .get_session(&[], None, GetSessionOptions::interactive())
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let silent = tokio::time::timeout(
            Duration::from_secs(2),
            provider.get_session(&[], None, GetSessionOptions::silent()),
        )
        .await
        .expect("silent lookup finished while sign-in was pending")
        .expect("silent lookup");

        assert!(silent.is_none());
        assert!(!interactive.is_finished());
        interactive.abort();
    }
}
