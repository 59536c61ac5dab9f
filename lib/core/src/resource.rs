//! Cognitive Services account types and instance snapshots.

use crate::id::{ParseIdError, SubscriptionId, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource-provider namespace of speech-capable accounts.
pub const COGNITIVE_SERVICES_NAMESPACE: &str = "Microsoft.CognitiveServices";

/// The closed set of account kinds that can serve speech requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Dedicated Speech account.
    #[serde(rename = "SpeechServices")]
    SpeechServices,
    /// Azure AI services account.
    #[serde(rename = "AIServices")]
    AiServices,
    /// Multi-service Cognitive Services account.
    #[serde(rename = "CognitiveServices")]
    CognitiveServices,
}

impl AccountType {
    /// Every kind, in the order they are offered for selection.
    pub const ALL: [Self; 3] = [
        Self::SpeechServices,
        Self::CognitiveServices,
        Self::AiServices,
    ];

    /// The ARM `kind` discriminator.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::SpeechServices => "SpeechServices",
            Self::AiServices => "AIServices",
            Self::CognitiveServices => "CognitiveServices",
        }
    }

    /// Human-readable name used in pickers.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SpeechServices => "Speech Service",
            Self::AiServices => "Azure AI service",
            Self::CognitiveServices => "Azure AI services multi-service account",
        }
    }

    /// Maps an ARM `kind` back to an account type.
    #[must_use]
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.kind().eq_ignore_ascii_case(kind))
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Canonical ARM resource identifier.
///
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Builds the identifier of a Cognitive Services account.
    #[must_use]
    pub fn for_account(subscription: &SubscriptionId, resource_group: &str, name: &str) -> Self {
        Self(format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/{COGNITIVE_SERVICES_NAMESPACE}/accounts/{name}"
        ))
    }

    /// Wraps an id exactly as ARM returned it.
    #[must_use]
    pub fn from_arm(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The segment following `subscriptions`.
    #[must_use]
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.segment_after("subscriptions").map(SubscriptionId::from)
    }

    /// The segment following `resourceGroups`, matched case-insensitively.
    #[must_use]
    pub fn resource_group(&self) -> Option<&str> {
        self.segment_after("resourceGroups")
    }

    /// The trailing resource name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.rsplit('/').find(|s| !s.is_empty())
    }

    fn segment_after(&self, key: &str) -> Option<&str> {
        let mut segments = self.0.split('/').filter(|s| !s.is_empty());
        while let Some(segment) = segments.next() {
            if segment.eq_ignore_ascii_case(key) {
                return segments.next();
            }
        }
        None
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self(s.trim().to_string());
        if !id.0.starts_with('/') || id.subscription_id().is_none() {
            return Err(ParseIdError {
                id_type: "ResourceId",
                reason: format!("'{s}' is not an ARM resource path"),
            });
        }
        Ok(id)
    }
}

/// A provisioned speech-capable account.
///
/// `id` is the identity; `name` is only unique within a resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureResourceInfo {
    pub id: ResourceId,
    pub name: String,
    pub subscription_id: SubscriptionId,
    pub subscription_name: String,
    pub tenant_id: TenantId,
    pub region: String,
    pub account_type: AccountType,
    pub sku: String,
}

impl AzureResourceInfo {
    /// Picker label: `name (account type, region, sku)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} ({}, {}, {})",
            self.name, self.account_type, self.region, self.sku
        )
    }
}

/// A pricing tier offered in a region, e.g. `S0 Standard`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkuOption {
    pub name: String,
    pub tier: String,
}

impl SkuOption {
    #[must_use]
    pub fn new(name: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: tier.into(),
        }
    }

    /// Extracts the SKU name from a rendered choice such as `"S0 Standard"`.
    #[must_use]
    pub fn name_of(choice: &str) -> &str {
        choice.split_whitespace().next().unwrap_or(choice)
    }
}

impl fmt::Display for SkuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tier.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} {}", self.name, self.tier)
        }
    }
}
