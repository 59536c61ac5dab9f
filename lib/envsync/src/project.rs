//! Where a sample project keeps its credentials.

use rootcause::Report;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use speechkit_core::{AzureResourceInfo, Credentials};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::env_file::{EnvKey, read_env_value, write_credentials};
use crate::error::EnvSyncError;
use crate::json_config::update_json_config;

/// File names within a project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    #[serde(default = "default_env_folder")]
    env_folder: String,
    #[serde(default = "default_env_file")]
    env_file: String,
    #[serde(default = "default_config_file")]
    config_file: String,
}

fn default_env_folder() -> String {
    ".env".to_string()
}

fn default_env_file() -> String {
    ".env.dev".to_string()
}

fn default_config_file() -> String {
    "config.json".to_string()
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            env_folder: default_env_folder(),
            env_file: default_env_file(),
            config_file: default_config_file(),
        }
    }
}

/// What [`ProjectLayout::sync_credentials`] touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub env_path: PathBuf,
    /// `None` when there was no `config.json` to update.
    pub config_path: Option<PathBuf>,
}

impl ProjectLayout {
    #[must_use]
    pub fn new(env_folder: impl Into<String>, env_file: impl Into<String>) -> Self {
        Self {
            env_folder: env_folder.into(),
            env_file: env_file.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn env_path(&self, project: &Path) -> PathBuf {
        project.join(&self.env_folder).join(&self.env_file)
    }

    #[must_use]
    pub fn config_path(&self, project: &Path) -> PathBuf {
        project.join(&self.config_file)
    }

    /// Writes the env file, then `config.json`.
    ///
    /// The two writes are independent: a `config.json` failure leaves the
    /// already written env file in place.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    #[instrument(skip(self, project, credentials, resource), fields(project = %project.display(), resource = %resource.name))]
    pub async fn sync_credentials(
        &self,
        project: &Path,
        credentials: &Credentials,
        resource: &AzureResourceInfo,
    ) -> Result<SyncReport, Report<EnvSyncError>> {
        let env_path = self.env_path(project);
        write_credentials(&env_path, &credential_pairs(credentials, resource)).await?;

        let config_path = self.config_path(project);
        let updated = update_json_config(&config_path, credentials).await?;
        Ok(SyncReport {
            env_path,
            config_path: updated.then_some(config_path),
        })
    }

    /// Whether the project's env file names a usable resource.
    ///
    /// Requires non-empty key, region, tenant and subscription values.
    ///
    /// # Errors
    ///
    /// Returns an error if the env file exists but cannot be read.
    pub async fn is_resource_configured(&self, project: &Path) -> Result<bool, Report<EnvSyncError>> {
        let path = self.env_path(project);
        for key in [
            EnvKey::SpeechResourceKey,
            EnvKey::ServiceRegion,
            EnvKey::TenantId,
            EnvKey::AzureSubscriptionId,
        ] {
            let value = read_env_value(&path, key.as_str()).await?;
            if value.is_none_or(|v| v.trim().is_empty()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// The env entries describing `resource` and its credentials.
#[must_use]
pub fn credential_pairs(
    credentials: &Credentials,
    resource: &AzureResourceInfo,
) -> Vec<(EnvKey, String)> {
    let mut pairs = vec![
        (
            EnvKey::SpeechResourceKey,
            credentials.key.expose_secret().to_string(),
        ),
        (EnvKey::ServiceRegion, credentials.normalized_region()),
        (
            EnvKey::AzureSubscriptionId,
            resource.subscription_id.to_string(),
        ),
        (EnvKey::TenantId, resource.tenant_id.to_string()),
        (EnvKey::SpeechResourceName, resource.name.clone()),
        (EnvKey::SpeechResourceSku, resource.sku.clone()),
    ];
    if let Some(subdomain) = &credentials.custom_subdomain_name {
        pairs.push((EnvKey::CustomSubdomainName, subdomain.clone()));
    }
    pairs
}
