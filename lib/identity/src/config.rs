//! Identity provider configuration.
//!
//! Fields with defaults can be omitted when loading from environment
//! variables; the defaults sign in to the public Azure cloud with the same
//! public client the Azure CLI uses.

use serde::{Deserialize, Serialize};

/// How sessions are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OAuth 2.0 device authorization grant against Entra ID.
    #[default]
    DeviceCode,
    /// Reuse the sign-in of an installed Azure CLI (`az`).
    AzureCli,
}

/// Configuration for signing in to Microsoft Entra ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Session provider implementation.
    #[serde(default)]
    provider: ProviderKind,
    /// Authority host, e.g. "https://login.microsoftonline.com".
    #[serde(default = "default_authority_host")]
    authority_host: String,
    /// Public client id registered with Entra ID.
    #[serde(default = "default_client_id")]
    client_id: String,
    /// Tenant used for the interactive sign-in ("organizations" for any work account).
    #[serde(default = "default_tenant")]
    tenant: String,
    /// Scopes as a comma-separated string.
    /// Default: the Azure Resource Manager `.default` scope.
    #[serde(default = "default_scopes")]
    scopes: String,
    /// How long to wait for the user to finish a device-code sign-in.
    #[serde(default = "default_login_timeout_seconds")]
    login_timeout_seconds: u64,
}

fn default_authority_host() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_client_id() -> String {
    "04b07795-8ddb-461a-bbee-02f9e1bf7b46".to_string()
}

fn default_tenant() -> String {
    "organizations".to_string()
}

fn default_scopes() -> String {
    crate::session::ARM_SCOPE.to_string()
}

fn default_login_timeout_seconds() -> u64 {
    900
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            authority_host: default_authority_host(),
            client_id: default_client_id(),
            tenant: default_tenant(),
            scopes: default_scopes(),
            login_timeout_seconds: default_login_timeout_seconds(),
        }
    }
}

impl IdentityConfig {
    /// Creates a configuration builder starting from the defaults.
    #[must_use]
    pub fn builder() -> IdentityConfigBuilder {
        IdentityConfigBuilder {
            config: Self::default(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    #[must_use]
    pub fn authority_host(&self) -> &str {
        self.authority_host.trim_end_matches('/')
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Returns the scopes to request, parsed from the comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn login_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.login_timeout_seconds)
    }

    /// Device authorization endpoint for `tenant`.
    #[must_use]
    pub fn device_code_url(&self, tenant: &str) -> String {
        format!("{}/{tenant}/oauth2/v2.0/devicecode", self.authority_host())
    }

    /// Token endpoint for `tenant`.
    #[must_use]
    pub fn token_url(&self, tenant: &str) -> String {
        format!("{}/{tenant}/oauth2/v2.0/token", self.authority_host())
    }
}

/// Builder for `IdentityConfig`.
#[derive(Debug)]
pub struct IdentityConfigBuilder {
    config: IdentityConfig,
}

impl IdentityConfigBuilder {
    #[must_use]
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = provider;
        self
    }

    #[must_use]
    pub fn authority_host(mut self, host: impl Into<String>) -> Self {
        self.config.authority_host = host.into();
        self
    }

    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    #[must_use]
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.config.tenant = tenant.into();
        self
    }

    /// Adds a scope unless it is already present.
    #[must_use]
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        let mut scopes = self.config.scopes();
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
        self.config.scopes = scopes.join(",");
        self
    }

    #[must_use]
    pub fn login_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.login_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn build(self) -> IdentityConfig {
        self.config
    }
}
