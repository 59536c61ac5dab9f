//! The signed-in account and its working selection.
//!
//! [`AccountManager`] is the explicit session context shared by every
//! provisioning component. It owns the login state machine, notifies
//! listeners on transitions, and holds the currently selected subscription
//! and resource. Nothing here is global; callers pass the manager around
//! behind an `Arc`.

use async_trait::async_trait;
use rootcause::Report;
use secrecy::SecretString;
use speechkit_core::{AzureResourceInfo, PromptError, Prompter, SubscriptionInfo, TenantId};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::IdentityError;
use crate::provider::{SessionProvider, TokenCredential};
use crate::session::{AccountClaims, AzureSession, GetSessionOptions, normalize_scopes};

/// Shown before an interactive sign-in.
pub const SIGN_IN_MESSAGE: &str = "The Azure AI Speech Toolkit will use Microsoft authentication to sign in Azure account and subscription to fetch Speech Resource Key and information for your project. You won't be charged until you confirm.";

/// Where the account is in the sign-in lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    SignedOut,
    SigningIn,
    SignedIn,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedOut => write!(f, "signed out"),
            Self::SigningIn => write!(f, "signing in"),
            Self::SignedIn => write!(f, "signed in"),
        }
    }
}

/// Snapshot returned by [`AccountManager::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStatus {
    pub state: LoginState,
    pub account: Option<AccountClaims>,
}

type StatusListener = Arc<dyn Fn(LoginState) + Send + Sync>;

#[derive(Default)]
struct AccountState {
    login: LoginState,
    account: Option<AccountClaims>,
    subscription: Option<SubscriptionInfo>,
    resource: Option<AzureResourceInfo>,
}

fn prompt_failed(err: &Report<PromptError>) -> IdentityError {
    IdentityError::Prompt {
        reason: err.current_context().to_string(),
    }
}

/// Session context for one signed-in Azure account.
pub struct AccountManager {
    provider: Arc<dyn SessionProvider>,
    prompter: Arc<dyn Prompter>,
    scopes: Vec<String>,
    state: RwLock<AccountState>,
    listeners: RwLock<Vec<StatusListener>>,
}

impl AccountManager {
    #[must_use]
    pub fn new(provider: Arc<dyn SessionProvider>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            provider,
            prompter,
            scopes: normalize_scopes(&[]),
            state: RwLock::new(AccountState::default()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Requests `scopes` instead of the management scope alone.
    #[must_use]
    pub fn with_scopes(mut self, scopes: &[String]) -> Self {
        self.scopes = normalize_scopes(scopes);
        self
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Registers a callback run once per login-state transition.
    pub fn add_status_listener(&self, listener: impl Fn(LoginState) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    #[must_use]
    pub fn status(&self) -> LoginStatus {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        LoginStatus {
            state: state.login,
            account: state.account.clone(),
        }
    }

    /// Claims of the signed-in account, if any.
    #[must_use]
    pub fn account_claims(&self) -> Option<AccountClaims> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .account
            .clone()
    }

    fn transition(&self, next: LoginState, account: Option<AccountClaims>) {
        let changed = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let changed = state.login != next;
            state.login = next;
            match next {
                LoginState::SignedIn => state.account = account,
                LoginState::SignedOut => {
                    state.account = None;
                    state.subscription = None;
                    state.resource = None;
                }
                LoginState::SigningIn => {}
            }
            changed
        };
        if !changed {
            return;
        }

        debug!(state = %next, "login state changed");
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(next);
        }
    }

    fn record_session(&self, session: Option<&AzureSession>) -> bool {
        match session {
            Some(session) => {
                self.transition(LoginState::SignedIn, Some(session.account().clone()));
                true
            }
            None => {
                self.transition(LoginState::SignedOut, None);
                false
            }
        }
    }

    /// Silently restores an existing sign-in, if the provider has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails.
    pub async fn initialize(&self) -> Result<LoginStatus, Report<IdentityError>> {
        self.is_user_logged_in().await?;
        Ok(self.status())
    }

    /// Asks the provider, without prompting, whether a session exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails.
    pub async fn is_user_logged_in(&self) -> Result<bool, Report<IdentityError>> {
        let session = self
            .provider
            .get_session(&self.scopes, None, GetSessionOptions::silent())
            .await?;
        Ok(self.record_session(session.as_ref()))
    }

    /// Signs in, reusing an existing session when one is available.
    ///
    /// With `show_dialog` the user must first confirm the sign-in.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when the confirmation is declined, `LoginTimeout`
    /// when the provider gives up waiting, provider errors otherwise.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn login(&self, show_dialog: bool) -> Result<AccountClaims, Report<IdentityError>> {
        if self.is_user_logged_in().await? {
            return Ok(self.account_claims().unwrap_or_default());
        }

        if show_dialog {
            let confirmed = self
                .prompter
                .confirm(SIGN_IN_MESSAGE, "Sign in")
                .await
                .map_err(|e| prompt_failed(&e))?;
            if !confirmed {
                return Err(IdentityError::UserCancelled.into());
            }
        }

        self.transition(LoginState::SigningIn, None);
        let result = self
            .provider
            .get_session(&self.scopes, None, GetSessionOptions::interactive())
            .await;
        match result {
            Ok(Some(session)) => {
                let account = session.account().clone();
                self.transition(LoginState::SignedIn, Some(account.clone()));
                info!(account = account.sign_in_name().unwrap_or("unknown"), "signed in");
                Ok(account)
            }
            Ok(None) => {
                self.transition(LoginState::SignedOut, None);
                Err(IdentityError::LoginTimeout.into())
            }
            Err(e) => {
                self.transition(LoginState::SignedOut, None);
                Err(e)
            }
        }
    }

    /// Returns the signed-in account, signing in first when allowed.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` when no session exists and `trigger_login` is false;
    /// otherwise whatever [`login`](Self::login) returns.
    pub async fn ensure_signed_in(
        &self,
        trigger_login: bool,
    ) -> Result<AccountClaims, Report<IdentityError>> {
        if self.is_user_logged_in().await? {
            return Ok(self.account_claims().unwrap_or_default());
        }
        if trigger_login {
            return self.login(true).await;
        }
        Err(IdentityError::NotSignedIn.into())
    }

    /// Signs out after confirmation. Returns false when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt or the provider fails.
    pub async fn logout(&self) -> Result<bool, Report<IdentityError>> {
        if !self.is_user_logged_in().await? {
            return Ok(false);
        }

        let name = self
            .account_claims()
            .and_then(|a| a.sign_in_name().map(str::to_string))
            .unwrap_or_else(|| "your account".to_string());
        let confirmed = self
            .prompter
            .confirm(&format!("Sign out of '{name}'?"), "Sign out")
            .await
            .map_err(|e| prompt_failed(&e))?;
        if !confirmed {
            return Ok(false);
        }

        self.provider.sign_out().await?;
        self.transition(LoginState::SignedOut, None);
        info!("signed out");
        Ok(true)
    }

    /// A session for `tenant_id`, without prompting.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` when the account is signed out or the provider cannot
    /// mint a token for that tenant silently.
    pub async fn session_for(
        &self,
        tenant_id: Option<&TenantId>,
    ) -> Result<AzureSession, Report<IdentityError>> {
        if self.status().state != LoginState::SignedIn {
            return Err(IdentityError::NotSignedIn.into());
        }
        self.provider
            .get_session(&self.scopes, tenant_id, GetSessionOptions::silent())
            .await?
            .ok_or_else(|| {
                warn!(tenant = tenant_id.map(TenantId::as_str), "no silent session for tenant");
                IdentityError::NotSignedIn.into()
            })
    }

    /// Replaces the selected subscription.
    pub fn select_subscription(&self, subscription: SubscriptionInfo) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state
            .resource
            .as_ref()
            .is_some_and(|r| r.subscription_id != subscription.id)
        {
            state.resource = None;
        }
        state.subscription = Some(subscription);
    }

    pub fn clear_subscription(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.subscription = None;
        state.resource = None;
    }

    #[must_use]
    pub fn selected_subscription(&self) -> Option<SubscriptionInfo> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscription
            .clone()
    }

    /// Replaces the selected resource.
    pub fn select_resource(&self, resource: AzureResourceInfo) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .resource = Some(resource);
    }

    #[must_use]
    pub fn selected_resource(&self) -> Option<AzureResourceInfo> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resource
            .clone()
    }
}

#[async_trait]
impl TokenCredential for AccountManager {
    async fn bearer_token(
        &self,
        tenant_id: Option<&TenantId>,
    ) -> Result<SecretString, Report<IdentityError>> {
        let session = self.session_for(tenant_id).await?;
        Ok(session.access_token().clone())
    }
}
