//! `KEY=VALUE` env files.

use rootcause::Report;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::error::EnvSyncError;

/// Keys the speech samples read from their env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvKey {
    SpeechResourceKey,
    ServiceRegion,
    AzureSubscriptionId,
    TenantId,
    SpeechResourceName,
    SpeechResourceSku,
    CustomSubdomainName,
}

impl EnvKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpeechResourceKey => "SPEECH_RESOURCE_KEY",
            Self::ServiceRegion => "SERVICE_REGION",
            Self::AzureSubscriptionId => "AZURE_SUBSCRIPTION_ID",
            Self::TenantId => "TENANT_ID",
            Self::SpeechResourceName => "SPEECH_RESOURCE_NAME",
            Self::SpeechResourceSku => "SPEECH_RESOURCE_SKU",
            Self::CustomSubdomainName => "CUSTOM_SUBDOMAIN_NAME",
        }
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replaces the first `KEY=...` line of each pair, or appends one.
///
/// Every other line comes back unchanged, and the original line ending
/// style is kept.
#[must_use]
pub fn upsert_lines(content: &str, pairs: &[(EnvKey, String)]) -> String {
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    for (key, value) in pairs {
        let prefix = format!("{key}=");
        let line = format!("{prefix}{value}");
        match lines.iter_mut().find(|l| l.starts_with(&prefix)) {
            Some(existing) => *existing = line,
            None => lines.push(line),
        }
    }
    let mut out = lines.join(newline);
    if !out.is_empty() {
        out.push_str(newline);
    }
    out
}

/// Writes `pairs` into the env file at `path`.
///
/// The file and its parent directory are created when missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
#[instrument(skip(path, pairs), fields(path = %path.display(), keys = pairs.len()))]
pub async fn write_credentials(
    path: &Path,
    pairs: &[(EnvKey, String)],
) -> Result<(), Report<EnvSyncError>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EnvSyncError::io(parent, &e))?;
    }

    let existing = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(EnvSyncError::io(path, &e).into()),
    };

    tokio::fs::write(path, upsert_lines(&existing, pairs))
        .await
        .map_err(|e| EnvSyncError::io(path, &e))?;
    info!("env file updated");
    Ok(())
}

/// Value of `key` in the env file, or `None` when the file or key is absent.
///
/// Malformed lines are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub async fn read_env_value(path: &Path, key: &str) -> Result<Option<String>, Report<EnvSyncError>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EnvSyncError::io(path, &e).into()),
    };

    for item in dotenvy::from_read_iter(bytes.as_slice()) {
        match item {
            Ok((k, v)) if k == key => return Ok(Some(v)),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed env line"),
        }
    }
    Ok(None)
}
