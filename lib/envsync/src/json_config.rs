//! Top-level key rewrites in a sample's `config.json`.

use rootcause::Report;
use secrecy::ExposeSecret;
use serde_json::Value;
use speechkit_core::Credentials;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use crate::error::EnvSyncError;

const SUBSCRIPTION_KEY: &str = "SubscriptionKey";
const SERVICE_REGION: &str = "ServiceRegion";
const CUSTOM_SUBDOMAIN_NAME: &str = "CustomSubDomainName";

/// Overwrites the credential keys a config object already has.
///
/// Keys the object lacks are not added. Returns whether anything changed.
pub fn apply_credentials(config: &mut serde_json::Map<String, Value>, credentials: &Credentials) -> bool {
    let mut updates = vec![
        (SUBSCRIPTION_KEY, credentials.key.expose_secret().to_string()),
        (SERVICE_REGION, credentials.normalized_region()),
    ];
    if let Some(subdomain) = &credentials.custom_subdomain_name {
        updates.push((CUSTOM_SUBDOMAIN_NAME, subdomain.clone()));
    }

    let mut changed = false;
    for (key, value) in updates {
        if let Some(slot) = config.get_mut(key) {
            *slot = Value::String(value);
            changed = true;
        }
    }
    changed
}

/// Updates `config.json` at `path` with `credentials`.
///
/// A missing file is skipped and reported as `Ok(false)`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or is not a
/// JSON object.
pub async fn update_json_config(
    path: &Path,
    credentials: &Credentials,
) -> Result<bool, Report<EnvSyncError>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config.json; skipping");
            return Ok(false);
        }
        Err(e) => return Err(EnvSyncError::io(path, &e).into()),
    };

    let invalid = |reason: String| EnvSyncError::InvalidJson {
        path: path.display().to_string(),
        reason,
    };
    let mut value: Value = serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(config) = &mut value else {
        return Err(invalid("top level is not an object".to_string()).into());
    };

    if !apply_credentials(config, credentials) {
        debug!(path = %path.display(), "config.json has no credential keys");
        return Ok(false);
    }

    let mut out = serde_json::to_string_pretty(&value).map_err(|e| invalid(e.to_string()))?;
    out.push('\n');
    tokio::fs::write(path, out)
        .await
        .map_err(|e| EnvSyncError::io(path, &e))?;
    info!(path = %path.display(), "config.json updated");
    Ok(true)
}
