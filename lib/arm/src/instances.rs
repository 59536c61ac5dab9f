//! Cognitive Services accounts: listing, creation and key retrieval.

use async_trait::async_trait;
use rootcause::Report;
use secrecy::SecretString;
use speechkit_core::{
    AccountType, AzureResourceInfo, COGNITIVE_SERVICES_NAMESPACE, Credentials, ResourceId,
    SkuOption, SubscriptionInfo,
};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::client::ArmClient;
use crate::error::ArmError;
use crate::models::{
    ACCOUNTS_RESOURCE_TYPE, AccountDto, AccountKeysDto, COGNITIVE_SERVICES_API_VERSION,
    CreateAccountProperties, CreateAccountRequest, DomainAvailabilityDto,
    DomainAvailabilityRequest, InstanceDetails, SkuDto,
};
use crate::retry::RetryPolicy;
use crate::validation::{InvalidName, check_instance_name};

/// Answer of the custom-subdomain availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAvailability {
    pub available: bool,
    pub reason: Option<String>,
}

/// Speech-capable accounts within a subscription.
#[async_trait]
pub trait ResourceInstances: Send + Sync {
    /// Accounts whose kind is in `account_types`, sorted by name.
    async fn list_instances(
        &self,
        subscription: &SubscriptionInfo,
        account_types: &[AccountType],
    ) -> Result<Vec<AzureResourceInfo>, Report<ArmError>>;

    /// Creates an account in an existing resource group.
    ///
    /// `sku` may be a rendered choice such as `"S0 Standard"`; only its
    /// first token is sent.
    async fn create_instance(
        &self,
        subscription: &SubscriptionInfo,
        resource_group: &str,
        region: &str,
        name: &str,
        sku: &str,
    ) -> Result<AzureResourceInfo, Report<ArmError>>;

    /// Reads the primary key and the location of an account.
    async fn fetch_keys_and_region(
        &self,
        resource: &AzureResourceInfo,
    ) -> Result<Credentials, Report<ArmError>>;

    async fn get_instance(
        &self,
        subscription: &SubscriptionInfo,
        resource_id: &ResourceId,
    ) -> Result<InstanceDetails, Report<ArmError>>;

    /// Whether `name` is free as a Cognitive Services subdomain.
    async fn check_name_available(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<NameAvailability, Report<ArmError>>;

    /// Validates a new account name; `Some` explains a rejection.
    ///
    /// Syntax is checked before the availability lookup.
    async fn validate_instance_name(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<Option<InvalidName>, Report<ArmError>> {
        if let Err(invalid) = check_instance_name(name) {
            return Ok(Some(invalid));
        }
        let availability = self.check_name_available(subscription, name).await?;
        if availability.available {
            return Ok(None);
        }
        Ok(Some(InvalidName::InstanceUnavailable {
            name: name.to_string(),
            reason: availability.reason,
        }))
    }
}

/// [`ResourceInstances`] backed by the Cognitive Services provider.
#[derive(Clone)]
pub struct ArmResourceInstances {
    client: ArmClient,
    kind: AccountType,
    provisioning: RetryPolicy,
}

impl ArmResourceInstances {
    /// Creates a client that provisions accounts of `kind`.
    #[must_use]
    pub fn new(client: ArmClient, kind: AccountType) -> Self {
        Self {
            client,
            kind,
            provisioning: RetryPolicy::new(20, Duration::from_secs(3)),
        }
    }

    /// Overrides how long to wait for a new account to finish provisioning.
    #[must_use]
    pub fn with_provisioning_policy(mut self, policy: RetryPolicy) -> Self {
        self.provisioning = policy;
        self
    }

    fn account_path(subscription: &str, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/{COGNITIVE_SERVICES_NAMESPACE}/{ACCOUNTS_RESOURCE_TYPE}/{name}"
        )
    }

    async fn get_account(
        &self,
        subscription: &SubscriptionInfo,
        resource_group: &str,
        name: &str,
    ) -> Result<AccountDto, Report<ArmError>> {
        self.client
            .get(
                Some(&subscription.tenant_id),
                &format!(
                    "{}?api-version={COGNITIVE_SERVICES_API_VERSION}",
                    Self::account_path(subscription.id.as_str(), resource_group, name)
                ),
            )
            .await
    }

    /// Polls a new account until ARM reports a terminal provisioning state.
    async fn await_provisioned(
        &self,
        subscription: &SubscriptionInfo,
        resource_group: &str,
        account: AccountDto,
    ) -> Result<AccountDto, Report<ArmError>> {
        let mut latest = account;
        let attempts = self.provisioning.max_attempts();
        for attempt in 1..=attempts {
            match latest.properties.provisioning_state.as_deref() {
                None | Some("Succeeded") => return Ok(latest),
                Some(state @ ("Failed" | "Canceled")) => {
                    return Err(ArmError::ProvisioningFailed {
                        name: latest.name.clone(),
                        state: state.to_string(),
                    }
                    .into());
                }
                Some(state) => debug!(account = %latest.name, state, attempt, "account provisioning"),
            }
            if attempt == attempts {
                break;
            }
            tokio::time::sleep(self.provisioning.delay_after(attempt)).await;
            latest = self
                .get_account(subscription, resource_group, &latest.name)
                .await?;
        }
        warn!(account = %latest.name, "account still provisioning; continuing");
        Ok(latest)
    }
}

/// Key listing failures that mean "you cannot have these credentials".
fn is_access_problem(err: &ArmError) -> bool {
    matches!(err.status(), Some(401 | 403 | 404))
}

#[async_trait]
impl ResourceInstances for ArmResourceInstances {
    #[instrument(skip(self, account_types), fields(subscription = %subscription.id))]
    async fn list_instances(
        &self,
        subscription: &SubscriptionInfo,
        account_types: &[AccountType],
    ) -> Result<Vec<AzureResourceInfo>, Report<ArmError>> {
        let accounts: Vec<AccountDto> = self
            .client
            .list(
                Some(&subscription.tenant_id),
                &format!(
                    "/subscriptions/{}/providers/{COGNITIVE_SERVICES_NAMESPACE}/{ACCOUNTS_RESOURCE_TYPE}?api-version={COGNITIVE_SERVICES_API_VERSION}",
                    subscription.id
                ),
            )
            .await?;
        let mut instances: Vec<AzureResourceInfo> = accounts
            .into_iter()
            .filter(|a| a.account_type().is_some_and(|t| account_types.contains(&t)))
            .filter_map(|a| a.into_resource_info(subscription))
            .collect();
        instances.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(instances)
    }

    #[instrument(skip(self), fields(subscription = %subscription.id, kind = self.kind.kind()))]
    async fn create_instance(
        &self,
        subscription: &SubscriptionInfo,
        resource_group: &str,
        region: &str,
        name: &str,
        sku: &str,
    ) -> Result<AzureResourceInfo, Report<ArmError>> {
        let request = CreateAccountRequest {
            location: region,
            kind: self.kind.kind(),
            sku: SkuDto {
                name: SkuOption::name_of(sku).to_string(),
            },
            properties: CreateAccountProperties {
                custom_sub_domain_name: name,
            },
        };
        let created: AccountDto = self
            .client
            .put(
                Some(&subscription.tenant_id),
                &format!(
                    "{}?api-version={COGNITIVE_SERVICES_API_VERSION}",
                    Self::account_path(subscription.id.as_str(), resource_group, name)
                ),
                &request,
            )
            .await?;
        let account = self
            .await_provisioned(subscription, resource_group, created)
            .await?;
        info!(account = name, resource_group, region, "account created");

        let id = ResourceId::from_arm(account.id.clone());
        account
            .into_resource_info(subscription)
            .ok_or_else(|| ArmError::InvalidResourceId { id: id.to_string() }.into())
    }

    #[instrument(skip(self, resource), fields(account = %resource.name))]
    async fn fetch_keys_and_region(
        &self,
        resource: &AzureResourceInfo,
    ) -> Result<Credentials, Report<ArmError>> {
        let missing = || ArmError::MissingKeyOrRegion {
            name: resource.name.clone(),
        };
        let resource_group = resource
            .id
            .resource_group()
            .ok_or_else(|| ArmError::InvalidResourceId {
                id: resource.id.to_string(),
            })?;
        let subscription = SubscriptionInfo::new(
            resource.subscription_id.clone(),
            resource.tenant_id.clone(),
            resource.subscription_name.clone(),
        );

        let account = match self
            .get_account(&subscription, resource_group, &resource.name)
            .await
        {
            Ok(account) => account,
            Err(err) if is_access_problem(err.current_context()) => {
                warn!(error = %err.current_context(), "account is not readable");
                return Err(missing().into());
            }
            Err(err) => return Err(err),
        };

        let keys: AccountKeysDto = match self
            .client
            .post(
                Some(&resource.tenant_id),
                &format!(
                    "{}/listKeys?api-version={COGNITIVE_SERVICES_API_VERSION}",
                    Self::account_path(resource.subscription_id.as_str(), resource_group, &resource.name)
                ),
                &serde_json::json!({}),
            )
            .await
        {
            Ok(keys) => keys,
            Err(err) if is_access_problem(err.current_context()) => {
                warn!(error = %err.current_context(), "keys are not listable");
                return Err(missing().into());
            }
            Err(err) => return Err(err),
        };

        let key = keys.key1.filter(|k| !k.is_empty()).ok_or_else(missing)?;
        if account.location.trim().is_empty() {
            return Err(missing().into());
        }
        Ok(
            Credentials::new(SecretString::from(key), account.location)
                .with_custom_subdomain(account.properties.custom_sub_domain_name),
        )
    }

    async fn get_instance(
        &self,
        subscription: &SubscriptionInfo,
        resource_id: &ResourceId,
    ) -> Result<InstanceDetails, Report<ArmError>> {
        let invalid = || ArmError::InvalidResourceId {
            id: resource_id.to_string(),
        };
        let resource_group = resource_id.resource_group().ok_or_else(invalid)?;
        let name = resource_id.name().ok_or_else(invalid)?;

        let account = self.get_account(subscription, resource_group, name).await?;
        Ok(account.into())
    }

    async fn check_name_available(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<NameAvailability, Report<ArmError>> {
        let answer: DomainAvailabilityDto = self
            .client
            .post(
                Some(&subscription.tenant_id),
                &format!(
                    "/subscriptions/{}/providers/{COGNITIVE_SERVICES_NAMESPACE}/checkDomainAvailability?api-version={COGNITIVE_SERVICES_API_VERSION}",
                    subscription.id
                ),
                &DomainAvailabilityRequest {
                    subdomain_name: name,
                    resource_type: "Microsoft.CognitiveServices/accounts",
                    kind: self.kind.kind(),
                },
            )
            .await?;
        Ok(NameAvailability {
            available: answer.is_subdomain_available,
            reason: answer.reason,
        })
    }
}
