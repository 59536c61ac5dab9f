//! ARM payload shapes and their mapping onto the core model.

use serde::{Deserialize, Serialize};
use speechkit_core::{
    AccountType, AzureResourceInfo, ResourceGroupInfo, ResourceId, SkuOption, SubscriptionInfo,
};

pub(crate) const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
pub(crate) const RESOURCES_API_VERSION: &str = "2021-04-01";
pub(crate) const COGNITIVE_SERVICES_API_VERSION: &str = "2023-05-01";

/// Resource type of Cognitive Services accounts within the provider namespace.
pub(crate) const ACCOUNTS_RESOURCE_TYPE: &str = "accounts";

/// Upper-cased, whitespace-free form used to compare locations
/// ("East US" and "eastus" both become "EASTUS").
#[must_use]
pub fn location_key(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TenantDto {
    pub tenant_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionDto {
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ResourceGroupDto {
    pub name: String,
    pub location: String,
}

impl From<ResourceGroupDto> for ResourceGroupInfo {
    fn from(dto: ResourceGroupDto) -> Self {
        Self::new(dto.name, dto.location)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderDto {
    #[serde(default)]
    pub resource_types: Vec<ProviderResourceTypeDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderResourceTypeDto {
    pub resource_type: String,
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceSkuDto {
    #[serde(default)]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

impl ResourceSkuDto {
    pub(crate) fn offers(&self, kind: AccountType) -> bool {
        self.resource_type.eq_ignore_ascii_case(ACCOUNTS_RESOURCE_TYPE)
            && self
                .kind
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(kind.kind()))
    }

    pub(crate) fn offered_in(&self, location_key: &str) -> bool {
        self.locations
            .iter()
            .any(|l| self::location_key(l) == location_key)
    }

    pub(crate) fn option(&self) -> SkuOption {
        SkuOption::new(self.name.clone(), self.tier.clone().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct SkuDto {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountPropertiesDto {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub custom_sub_domain_name: Option<String>,
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccountDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sku: Option<SkuDto>,
    #[serde(default)]
    pub properties: AccountPropertiesDto,
}

impl AccountDto {
    pub(crate) fn account_type(&self) -> Option<AccountType> {
        self.kind.as_deref().and_then(AccountType::from_kind)
    }

    /// Maps onto the core model; `None` for kinds outside the speech set.
    pub(crate) fn into_resource_info(self, subscription: &SubscriptionInfo) -> Option<AzureResourceInfo> {
        let account_type = self.account_type()?;
        Some(AzureResourceInfo {
            id: ResourceId::from_arm(self.id),
            name: self.name,
            subscription_id: subscription.id.clone(),
            subscription_name: subscription.name.clone(),
            tenant_id: subscription.tenant_id.clone(),
            region: self.location,
            account_type,
            sku: self.sku.map(|s| s.name).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateAccountRequest<'a> {
    pub location: &'a str,
    pub kind: &'static str,
    pub sku: SkuDto,
    pub properties: CreateAccountProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateAccountProperties<'a> {
    pub custom_sub_domain_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountKeysDto {
    #[serde(default)]
    pub key1: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DomainAvailabilityRequest<'a> {
    pub subdomain_name: &'a str,
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DomainAvailabilityDto {
    pub is_subdomain_available: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Live properties of one account, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceDetails {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
    /// ARM `kind`, which may be outside the speech-capable set.
    pub kind: Option<String>,
    pub sku: Option<String>,
    pub endpoint: Option<String>,
    pub custom_subdomain_name: Option<String>,
    pub provisioning_state: Option<String>,
}

impl InstanceDetails {
    #[must_use]
    pub fn account_type(&self) -> Option<AccountType> {
        self.kind.as_deref().and_then(AccountType::from_kind)
    }
}

impl From<AccountDto> for InstanceDetails {
    fn from(dto: AccountDto) -> Self {
        Self {
            id: ResourceId::from_arm(dto.id),
            name: dto.name,
            location: dto.location,
            kind: dto.kind,
            sku: dto.sku.map(|s| s.name),
            endpoint: dto.properties.endpoint,
            custom_subdomain_name: dto.properties.custom_sub_domain_name,
            provisioning_state: dto.properties.provisioning_state,
        }
    }
}
