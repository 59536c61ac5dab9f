//! Access credentials extracted from a provisioned account.

use secrecy::SecretString;

/// Key, region and optional custom subdomain of a speech account.
///
/// The key is only exposed through [`secrecy::ExposeSecret`]; `Debug`
/// redacts it, so the struct is safe to hand to `tracing`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: SecretString,
    pub region: String,
    pub custom_subdomain_name: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(key: SecretString, region: impl Into<String>) -> Self {
        Self {
            key,
            region: region.into(),
            custom_subdomain_name: None,
        }
    }

    #[must_use]
    pub fn with_custom_subdomain(mut self, name: Option<String>) -> Self {
        self.custom_subdomain_name = name.filter(|n| !n.is_empty());
        self
    }

    /// Region as written to configuration files: lower-cased, spaces removed.
    #[must_use]
    pub fn normalized_region(&self) -> String {
        normalize_region(&self.region)
    }
}

/// Lower-cases a region display name and strips its spaces (`East US` → `eastus`).
#[must_use]
pub fn normalize_region(region: &str) -> String {
    region
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}
