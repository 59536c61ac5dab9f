//! Resource groups and Cognitive Services provider metadata.

use async_trait::async_trait;
use rootcause::Report;
use speechkit_core::{
    AccountType, COGNITIVE_SERVICES_NAMESPACE, ResourceGroupInfo, SkuOption, SubscriptionInfo,
    normalize_region,
};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument, warn};

use crate::client::ArmClient;
use crate::error::ArmError;
use crate::models::{
    ACCOUNTS_RESOURCE_TYPE, COGNITIVE_SERVICES_API_VERSION, ProviderDto, RESOURCES_API_VERSION,
    ResourceGroupDto, ResourceSkuDto, location_key,
};
use crate::retry::RetryPolicy;
use crate::validation::{InvalidName, check_resource_group_name};

/// Resource-group CRUD and region/SKU discovery for one account kind.
#[async_trait]
pub trait ResourceManagement: Send + Sync {
    async fn list_resource_groups(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Vec<ResourceGroupInfo>, Report<ArmError>>;

    async fn check_resource_group_exists(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<bool, Report<ArmError>>;

    /// Creates or updates a resource group.
    async fn create_resource_group(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupInfo, Report<ArmError>>;

    /// Regions offering the target kind, as lower-case location codes.
    async fn list_available_regions(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Vec<String>, Report<ArmError>>;

    /// Pricing tiers of the target kind in `location`.
    ///
    /// An empty result is reported as `NoPricingTierAvailable`.
    async fn list_available_skus(
        &self,
        subscription: &SubscriptionInfo,
        location: &str,
    ) -> Result<Vec<SkuOption>, Report<ArmError>>;

    /// Makes sure `name` exists and is visible before returning.
    ///
    /// Safe to call repeatedly: an existing group is left alone. A create
    /// rejected with 409 (another caller won the race) still waits for the
    /// group to become visible.
    async fn ensure_resource_group(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
        location: &str,
        policy: RetryPolicy,
    ) -> Result<(), Report<ArmError>> {
        if self.check_resource_group_exists(subscription, name).await? {
            debug!(resource_group = name, "resource group already exists");
            return Ok(());
        }

        match self.create_resource_group(subscription, name, location).await {
            Ok(_) => info!(resource_group = name, location, "resource group created"),
            Err(err) if err.current_context().status() == Some(409) => {
                warn!(
                    resource_group = name,
                    "resource group created concurrently, waiting for it"
                );
            }
            Err(err) => return Err(err),
        }

        let visible = policy
            .poll_until(|_| self.check_resource_group_exists(subscription, name))
            .await?;
        if !visible {
            return Err(ArmError::ResourceGroupNotReady {
                name: name.to_string(),
                attempts: policy.max_attempts(),
            }
            .into());
        }
        Ok(())
    }

    /// Validates a new resource-group name; `Some` explains a rejection.
    ///
    /// Syntax is checked before the existence lookup.
    async fn validate_resource_group_name(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<Option<InvalidName>, Report<ArmError>> {
        if let Err(invalid) = check_resource_group_name(name) {
            return Ok(Some(invalid));
        }
        if self.check_resource_group_exists(subscription, name).await? {
            return Ok(Some(InvalidName::ResourceGroupExists {
                name: name.to_string(),
            }));
        }
        Ok(None)
    }
}

/// Locations listed for `accounts` in the provider metadata.
fn provider_account_locations(provider: &ProviderDto) -> Vec<String> {
    provider
        .resource_types
        .iter()
        .filter(|t| t.resource_type.eq_ignore_ascii_case(ACCOUNTS_RESOURCE_TYPE))
        .flat_map(|t| t.locations.iter().cloned())
        .collect()
}

/// Provider locations that also carry a SKU of `kind`, deduplicated and sorted.
pub(crate) fn regions_for(
    provider: &ProviderDto,
    skus: &[ResourceSkuDto],
    kind: AccountType,
) -> Vec<String> {
    let sku_locations: HashSet<String> = skus
        .iter()
        .filter(|s| s.offers(kind))
        .flat_map(|s| s.locations.iter().map(|l| location_key(l)))
        .collect();
    provider_account_locations(provider)
        .iter()
        .filter(|l| sku_locations.contains(&location_key(l)))
        .map(|l| normalize_region(l))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// SKUs of `kind` offered in `location`.
pub(crate) fn skus_for(
    skus: &[ResourceSkuDto],
    kind: AccountType,
    location: &str,
) -> Result<Vec<SkuOption>, ArmError> {
    let key = location_key(location);
    let options: Vec<SkuOption> = skus
        .iter()
        .filter(|s| s.offers(kind) && s.offered_in(&key))
        .map(ResourceSkuDto::option)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if options.is_empty() {
        return Err(ArmError::NoPricingTierAvailable {
            location: location.to_string(),
        });
    }
    Ok(options)
}

/// [`ResourceManagement`] backed by ARM.
#[derive(Clone)]
pub struct ArmResourceManagement {
    client: ArmClient,
    kind: AccountType,
}

impl ArmResourceManagement {
    /// Creates a client that discovers regions and SKUs for `kind`.
    #[must_use]
    pub fn new(client: ArmClient, kind: AccountType) -> Self {
        Self { client, kind }
    }

    async fn provider(&self, subscription: &SubscriptionInfo) -> Result<ProviderDto, Report<ArmError>> {
        self.client
            .get(
                Some(&subscription.tenant_id),
                &format!(
                    "/subscriptions/{}/providers/{COGNITIVE_SERVICES_NAMESPACE}?api-version={RESOURCES_API_VERSION}",
                    subscription.id
                ),
            )
            .await
    }

    async fn skus(&self, subscription: &SubscriptionInfo) -> Result<Vec<ResourceSkuDto>, Report<ArmError>> {
        self.client
            .list(
                Some(&subscription.tenant_id),
                &format!(
                    "/subscriptions/{}/providers/{COGNITIVE_SERVICES_NAMESPACE}/skus?api-version={COGNITIVE_SERVICES_API_VERSION}",
                    subscription.id
                ),
            )
            .await
    }
}

fn resource_group_path(subscription: &SubscriptionInfo, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourcegroups/{name}?api-version={RESOURCES_API_VERSION}",
        subscription.id
    )
}

#[async_trait]
impl ResourceManagement for ArmResourceManagement {
    #[instrument(skip(self), fields(subscription = %subscription.id))]
    async fn list_resource_groups(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Vec<ResourceGroupInfo>, Report<ArmError>> {
        let groups: Vec<ResourceGroupDto> = self
            .client
            .list(
                Some(&subscription.tenant_id),
                &format!(
                    "/subscriptions/{}/resourcegroups?api-version={RESOURCES_API_VERSION}",
                    subscription.id
                ),
            )
            .await?;
        Ok(groups.into_iter().map(ResourceGroupInfo::from).collect())
    }

    async fn check_resource_group_exists(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<bool, Report<ArmError>> {
        self.client
            .exists(
                Some(&subscription.tenant_id),
                &resource_group_path(subscription, name),
            )
            .await
    }

    #[instrument(skip(self), fields(subscription = %subscription.id))]
    async fn create_resource_group(
        &self,
        subscription: &SubscriptionInfo,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupInfo, Report<ArmError>> {
        let created: ResourceGroupDto = self
            .client
            .put(
                Some(&subscription.tenant_id),
                &resource_group_path(subscription, name),
                &serde_json::json!({ "location": location }),
            )
            .await?;
        Ok(created.into())
    }

    #[instrument(skip(self), fields(subscription = %subscription.id, kind = self.kind.kind()))]
    async fn list_available_regions(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Vec<String>, Report<ArmError>> {
        let provider = self.provider(subscription).await?;
        let skus = self.skus(subscription).await?;
        Ok(regions_for(&provider, &skus, self.kind))
    }

    #[instrument(skip(self), fields(subscription = %subscription.id, kind = self.kind.kind()))]
    async fn list_available_skus(
        &self,
        subscription: &SubscriptionInfo,
        location: &str,
    ) -> Result<Vec<SkuOption>, Report<ArmError>> {
        let skus = self.skus(subscription).await?;
        Ok(skus_for(&skus, self.kind, location)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_for;
    use mockito::Matcher;
    use std::sync::{Arc, Mutex};

    fn subscription() -> SubscriptionInfo {
        SubscriptionInfo::new("s1", "t1", "Dev")
    }

    fn provider() -> ProviderDto {
        serde_json::from_str(
            r#"{"resourceTypes":[
                {"resourceType":"accounts","locations":["East US","West Europe","Japan East","West US"]},
                {"resourceType":"operations","locations":["Brazil South"]}
            ]}"#,
        )
        .expect("provider")
    }

    fn skus() -> Vec<ResourceSkuDto> {
        serde_json::from_str(
            r#"[
                {"resourceType":"accounts","name":"S0","tier":"Standard","kind":"AIServices","locations":["EASTUS"]},
                {"resourceType":"accounts","name":"S0","tier":"Standard","kind":"AIServices","locations":["WESTEUROPE"]},
                {"resourceType":"accounts","name":"F0","tier":"Free","kind":"SpeechServices","locations":["WESTUS"]},
                {"resourceType":"accounts","name":"S0","tier":"Standard","kind":"SpeechServices","locations":["EASTUS"]},
                {"resourceType":"accounts","name":"S0","tier":"Standard","kind":"AIServices","locations":["BRAZILSOUTH"]}
            ]"#,
        )
        .expect("skus")
    }

    #[test]
    fn regions_intersect_provider_and_sku_locations() {
        assert_eq!(
            regions_for(&provider(), &skus(), AccountType::AiServices),
            vec!["eastus", "westeurope"]
        );
        assert_eq!(
            regions_for(&provider(), &skus(), AccountType::SpeechServices),
            vec!["eastus", "westus"]
        );
    }

    #[test]
    fn sku_lookup_normalizes_location() {
        let options = skus_for(&skus(), AccountType::SpeechServices, "East US").expect("skus");
        assert_eq!(options, vec![SkuOption::new("S0", "Standard")]);
    }

    #[test]
    fn missing_sku_is_domain_error() {
        let err = skus_for(&skus(), AccountType::AiServices, "Japan East").unwrap_err();
        assert_eq!(
            err,
            ArmError::NoPricingTierAvailable {
                location: "Japan East".to_string()
            }
        );
    }

    /// In-memory resource groups that become visible after `lag` lookups.
    struct FakeGroups {
        groups: Mutex<Vec<String>>,
        lag: Mutex<u32>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeGroups {
        fn new(existing: &[&str], lag: u32) -> Self {
            Self {
                groups: Mutex::new(existing.iter().map(ToString::to_string).collect()),
                lag: Mutex::new(lag),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ResourceManagement for FakeGroups {
        async fn list_resource_groups(
            &self,
            _subscription: &SubscriptionInfo,
        ) -> Result<Vec<ResourceGroupInfo>, Report<ArmError>> {
            Ok(Vec::new())
        }

        async fn check_resource_group_exists(
            &self,
            _subscription: &SubscriptionInfo,
            name: &str,
        ) -> Result<bool, Report<ArmError>> {
            self.calls.lock().unwrap().push(format!("exists {name}"));
            let mut lag = self.lag.lock().unwrap();
            if self.groups.lock().unwrap().iter().any(|g| g == name) {
                if *lag == 0 {
                    return Ok(true);
                }
                *lag -= 1;
            }
            Ok(false)
        }

        async fn create_resource_group(
            &self,
            _subscription: &SubscriptionInfo,
            name: &str,
            location: &str,
        ) -> Result<ResourceGroupInfo, Report<ArmError>> {
            self.calls.lock().unwrap().push(format!("create {name}"));
            let mut groups = self.groups.lock().unwrap();
            if groups.iter().any(|g| g == name) {
                return Err(ArmError::Status {
                    status: 409,
                    code: Some("Conflict".to_string()),
                    message: "already exists".to_string(),
                    retry_after: None,
                }
                .into());
            }
            groups.push(name.to_string());
            Ok(ResourceGroupInfo::new(name, location))
        }

        async fn list_available_regions(
            &self,
            _subscription: &SubscriptionInfo,
        ) -> Result<Vec<String>, Report<ArmError>> {
            Ok(Vec::new())
        }

        async fn list_available_skus(
            &self,
            _subscription: &SubscriptionInfo,
            _location: &str,
        ) -> Result<Vec<SkuOption>, Report<ArmError>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn ensure_resource_group_is_idempotent() {
        let groups = FakeGroups::new(&[], 0);
        let policy = RetryPolicy::immediate();

        groups
            .ensure_resource_group(&subscription(), "rg1", "eastus", policy)
            .await
            .expect("first");
        groups
            .ensure_resource_group(&subscription(), "rg1", "eastus", policy)
            .await
            .expect("second");

        let calls = groups.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|c| c.starts_with("create")).count(), 1);
    }

    #[tokio::test]
    async fn ensure_resource_group_polls_until_visible() {
        let groups = FakeGroups::new(&[], 2);

        groups
            .ensure_resource_group(&subscription(), "rg1", "eastus", RetryPolicy::immediate())
            .await
            .expect("ensure");

        assert_eq!(
            *groups.calls.lock().unwrap(),
            vec!["exists rg1", "create rg1", "exists rg1", "exists rg1", "exists rg1"]
        );
    }

    #[tokio::test]
    async fn ensure_resource_group_tolerates_racing_create() {
        let groups = FakeGroups::new(&["rg1"], 1);

        groups
            .ensure_resource_group(&subscription(), "rg1", "eastus", RetryPolicy::immediate())
            .await
            .expect("ensure");

        assert_eq!(
            *groups.calls.lock().unwrap(),
            vec!["exists rg1", "create rg1", "exists rg1"]
        );
    }

    #[tokio::test]
    async fn ensure_resource_group_fails_when_never_visible() {
        let groups = FakeGroups::new(&[], 100);

        let err = groups
            .ensure_resource_group(&subscription(), "rg1", "eastus", RetryPolicy::immediate())
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &ArmError::ResourceGroupNotReady {
                name: "rg1".to_string(),
                attempts: 5
            }
        );
    }

    #[tokio::test]
    async fn invalid_group_name_skips_existence_check() {
        let groups = FakeGroups::new(&["rg1"], 0);

        let invalid = groups
            .validate_resource_group_name(&subscription(), "bad/name.")
            .await
            .expect("validate");

        assert_eq!(invalid, Some(InvalidName::ResourceGroupCharacters));
        assert!(groups.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_group_name_is_rejected() {
        let groups = FakeGroups::new(&["rg1"], 0);
        let invalid = groups
            .validate_resource_group_name(&subscription(), "rg1")
            .await
            .expect("validate");
        assert_eq!(
            invalid,
            Some(InvalidName::ResourceGroupExists {
                name: "rg1".to_string()
            })
        );
        assert_eq!(
            groups
                .validate_resource_group_name(&subscription(), "rg2")
                .await
                .expect("validate"),
            None
        );
    }

    #[tokio::test]
    async fn arm_lists_groups_across_pages() {
        let mut server = mockito::Server::new_async().await;
        let next = format!("{}/subscriptions/s1/resourcegroups-page2", server.url());
        server
            .mock("GET", "/subscriptions/s1/resourcegroups")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer t0ken")
            .with_status(200)
            .with_body(format!(
                r#"{{"value":[{{"name":"rg1","location":"eastus"}}],"nextLink":"{next}"}}"#
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/subscriptions/s1/resourcegroups-page2")
            .with_status(200)
            .with_body(r#"{"value":[{"name":"rg2","location":"westus"}]}"#)
            .create_async()
            .await;
        let management = ArmResourceManagement::new(client_for(&server), AccountType::AiServices);

        let groups = management
            .list_resource_groups(&subscription())
            .await
            .expect("list");

        assert_eq!(
            groups,
            vec![
                ResourceGroupInfo::new("rg1", "eastus"),
                ResourceGroupInfo::new("rg2", "westus")
            ]
        );
    }

    #[tokio::test]
    async fn arm_head_checks_existence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/subscriptions/s1/resourcegroups/rg1")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("HEAD", "/subscriptions/s1/resourcegroups/rg2")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let management = ArmResourceManagement::new(client_for(&server), AccountType::AiServices);

        assert!(
            management
                .check_resource_group_exists(&subscription(), "rg1")
                .await
                .expect("head")
        );
        assert!(
            !management
                .check_resource_group_exists(&subscription(), "rg2")
                .await
                .expect("head")
        );
    }
}
