//! In-memory fakes shared by the workflow tests.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use rootcause::Report;
use secrecy::SecretString;
use speechkit_arm::{
    AccountDirectory, ArmError, InstanceDetails, NameAvailability, ResourceInstances,
    ResourceManagement,
};
use speechkit_core::{
    AccountType, AzureResourceInfo, Credentials, InputConfig, PromptError, Prompter, ResourceGroupInfo,
    ResourceId, SelectConfig, SkuOption, SubscriptionInfo, TenantId,
};
use speechkit_identity::{
    AccountClaims, AccountManager, AzureSession, GetSessionOptions, IdentityError, SessionProvider,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::resolver::SelectionResolver;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A speech account in `s1`/`rg1`, eastus, S0.
pub(crate) fn speech_resource(name: &str) -> AzureResourceInfo {
    AzureResourceInfo {
        id: ResourceId::for_account(&"s1".into(), "rg1", name),
        name: name.to_string(),
        subscription_id: "s1".into(),
        subscription_name: "Contoso".to_string(),
        tenant_id: "t1".into(),
        region: "eastus".to_string(),
        account_type: AccountType::SpeechServices,
        sku: "S0".to_string(),
    }
}

/// Provider that is signed in as `jane@contoso.com` once asked to be.
pub(crate) struct FakeProvider {
    signed_in: Mutex<bool>,
}

impl FakeProvider {
    fn session() -> AzureSession {
        AzureSession::new(
            None,
            Vec::new(),
            SecretString::from("token"),
            Utc::now() + TimeDelta::hours(1),
        )
        .with_account(AccountClaims {
            email: Some("jane@contoso.com".to_string()),
            ..AccountClaims::default()
        })
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn get_session(
        &self,
        _scopes: &[String],
        _tenant_id: Option<&TenantId>,
        options: GetSessionOptions,
    ) -> Result<Option<AzureSession>, Report<IdentityError>> {
        let mut signed_in = lock(&self.signed_in);
        if options.create_if_none {
            *signed_in = true;
        }
        Ok(signed_in.then(Self::session))
    }

    async fn sign_out(&self) -> Result<(), Report<IdentityError>> {
        *lock(&self.signed_in) = false;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Answer {
    Select(String),
    Input(String),
    AcceptDefault,
    Confirm(bool),
    Cancel,
}

/// Prompter answering from a script, recording what it was shown.
///
/// An exhausted script cancels; confirmations default to yes.
#[derive(Default)]
pub(crate) struct Scripted {
    answers: Mutex<VecDeque<Answer>>,
    selects: Mutex<Vec<SelectConfig>>,
    inputs: Mutex<Vec<InputConfig>>,
}

impl Scripted {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn then(self, answer: Answer) -> Self {
        lock(&self.answers).push_back(answer);
        self
    }

    pub(crate) fn select(self, id: &str) -> Self {
        self.then(Answer::Select(id.to_string()))
    }

    pub(crate) fn input(self, text: &str) -> Self {
        self.then(Answer::Input(text.to_string()))
    }

    pub(crate) fn accept_default(self) -> Self {
        self.then(Answer::AcceptDefault)
    }

    pub(crate) fn confirm(self, answer: bool) -> Self {
        self.then(Answer::Confirm(answer))
    }

    pub(crate) fn cancel(self) -> Self {
        self.then(Answer::Cancel)
    }

    pub(crate) fn selects(&self) -> Vec<SelectConfig> {
        lock(&self.selects).clone()
    }

    pub(crate) fn inputs(&self) -> Vec<InputConfig> {
        lock(&self.inputs).clone()
    }

    fn next(&self) -> Option<Answer> {
        lock(&self.answers).pop_front()
    }
}

#[async_trait]
impl Prompter for Scripted {
    async fn select_option(
        &self,
        config: &SelectConfig,
    ) -> Result<Option<String>, Report<PromptError>> {
        lock(&self.selects).push(config.clone());
        match self.next() {
            Some(Answer::Select(id)) => Ok(Some(id)),
            None | Some(Answer::Cancel) => Ok(None),
            Some(other) => panic!("picker '{}' got scripted {other:?}", config.name),
        }
    }

    async fn input_text(
        &self,
        config: &InputConfig,
    ) -> Result<Option<String>, Report<PromptError>> {
        lock(&self.inputs).push(config.clone());
        match self.next() {
            Some(Answer::Input(text)) => Ok(Some(text)),
            Some(Answer::AcceptDefault) => Ok(config.default.clone()),
            None | Some(Answer::Cancel) => Ok(None),
            Some(other) => panic!("input '{}' got scripted {other:?}", config.prompt),
        }
    }

    async fn confirm(&self, _message: &str, _action: &str) -> Result<bool, Report<PromptError>> {
        let mut answers = lock(&self.answers);
        if let Some(Answer::Confirm(answer)) = answers.front().cloned() {
            answers.pop_front();
            return Ok(answer);
        }
        Ok(true)
    }
}

/// One fake subscription landscape behind every ARM seam.
pub(crate) struct FakeCloud {
    subscriptions: Vec<SubscriptionInfo>,
    groups: Mutex<Vec<ResourceGroupInfo>>,
    regions: Mutex<Vec<String>>,
    skus: Mutex<Vec<SkuOption>>,
    resources: Mutex<Vec<AzureResourceInfo>>,
    details: Mutex<Vec<InstanceDetails>>,
    create_failure: Mutex<Option<ArmError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeCloud {
    fn new(subscriptions: Vec<SubscriptionInfo>) -> Self {
        Self {
            subscriptions,
            groups: Mutex::new(Vec::new()),
            regions: Mutex::new(vec!["eastus".to_string(), "westus2".to_string()]),
            skus: Mutex::new(vec![SkuOption::new("F0", "Free"), SkuOption::new("S0", "Standard")]),
            resources: Mutex::new(Vec::new()),
            details: Mutex::new(Vec::new()),
            create_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn subscription_of(&self, id: &SubscriptionInfo) -> SubscriptionInfo {
        self.subscriptions
            .iter()
            .find(|s| s.id == id.id)
            .cloned()
            .unwrap_or_else(|| id.clone())
    }
}

#[async_trait]
impl AccountDirectory for FakeCloud {
    async fn list_tenants(&self) -> Result<Vec<TenantId>, Report<ArmError>> {
        Ok(self.subscriptions.iter().map(|s| s.tenant_id.clone()).collect())
    }

    async fn list_tenant_subscriptions(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<SubscriptionInfo>, Report<ArmError>> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, Report<ArmError>> {
        self.record("list_subscriptions".to_string());
        Ok(self.subscriptions.clone())
    }
}

#[async_trait]
impl ResourceManagement for FakeCloud {
    async fn list_resource_groups(
        &self,
        _subscription: &SubscriptionInfo,
    ) -> Result<Vec<ResourceGroupInfo>, Report<ArmError>> {
        self.record("list_resource_groups".to_string());
        Ok(lock(&self.groups).clone())
    }

    async fn check_resource_group_exists(
        &self,
        _subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<bool, Report<ArmError>> {
        self.record(format!("check_resource_group_exists({name})"));
        Ok(lock(&self.groups).iter().any(|g| g.name == name))
    }

    async fn create_resource_group(
        &self,
        _subscription: &SubscriptionInfo,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupInfo, Report<ArmError>> {
        self.record(format!("create_resource_group({name}, {location})"));
        let group = ResourceGroupInfo::new(name, location);
        lock(&self.groups).push(group.clone());
        Ok(group)
    }

    async fn list_available_regions(
        &self,
        _subscription: &SubscriptionInfo,
    ) -> Result<Vec<String>, Report<ArmError>> {
        self.record("list_available_regions".to_string());
        Ok(lock(&self.regions).clone())
    }

    async fn list_available_skus(
        &self,
        _subscription: &SubscriptionInfo,
        location: &str,
    ) -> Result<Vec<SkuOption>, Report<ArmError>> {
        self.record(format!("list_available_skus({location})"));
        let skus = lock(&self.skus).clone();
        if skus.is_empty() {
            return Err(ArmError::NoPricingTierAvailable {
                location: location.to_string(),
            }
            .into());
        }
        Ok(skus)
    }
}

#[async_trait]
impl ResourceInstances for FakeCloud {
    async fn list_instances(
        &self,
        _subscription: &SubscriptionInfo,
        account_types: &[AccountType],
    ) -> Result<Vec<AzureResourceInfo>, Report<ArmError>> {
        self.record("list_instances".to_string());
        Ok(lock(&self.resources)
            .iter()
            .filter(|r| account_types.contains(&r.account_type))
            .cloned()
            .collect())
    }

    async fn create_instance(
        &self,
        subscription: &SubscriptionInfo,
        resource_group: &str,
        region: &str,
        name: &str,
        sku: &str,
    ) -> Result<AzureResourceInfo, Report<ArmError>> {
        self.record(format!(
            "create_instance({resource_group}, {region}, {name}, {sku})"
        ));
        if let Some(err) = lock(&self.create_failure).take() {
            return Err(err.into());
        }
        let subscription = self.subscription_of(subscription);
        let resource = AzureResourceInfo {
            id: ResourceId::for_account(&subscription.id, resource_group, name),
            name: name.to_string(),
            subscription_id: subscription.id,
            subscription_name: subscription.name,
            tenant_id: subscription.tenant_id,
            region: region.to_string(),
            account_type: AccountType::AiServices,
            sku: SkuOption::name_of(sku).to_string(),
        };
        lock(&self.resources).push(resource.clone());
        Ok(resource)
    }

    async fn fetch_keys_and_region(
        &self,
        resource: &AzureResourceInfo,
    ) -> Result<Credentials, Report<ArmError>> {
        self.record(format!("fetch_keys_and_region({})", resource.name));
        Ok(
            Credentials::new(SecretString::from(format!("key-{}", resource.name)), &resource.region)
                .with_custom_subdomain(Some(resource.name.clone())),
        )
    }

    async fn get_instance(
        &self,
        _subscription: &SubscriptionInfo,
        resource_id: &ResourceId,
    ) -> Result<InstanceDetails, Report<ArmError>> {
        self.record(format!("get_instance({})", resource_id.name().unwrap_or_default()));
        if let Some(details) = lock(&self.details).iter().find(|d| &d.id == resource_id) {
            return Ok(details.clone());
        }
        lock(&self.resources)
            .iter()
            .find(|r| &r.id == resource_id)
            .map(|r| InstanceDetails {
                id: r.id.clone(),
                name: r.name.clone(),
                location: r.region.clone(),
                kind: Some(r.account_type.kind().to_string()),
                sku: Some(r.sku.clone()),
                endpoint: Some(format!("https://{}.cognitiveservices.azure.com/", r.name)),
                custom_subdomain_name: Some(r.name.clone()),
                provisioning_state: Some("Succeeded".to_string()),
            })
            .ok_or_else(|| {
                ArmError::Status {
                    status: 404,
                    code: Some("ResourceNotFound".to_string()),
                    message: "not found".to_string(),
                    retry_after: None,
                }
                .into()
            })
    }

    async fn check_name_available(
        &self,
        _subscription: &SubscriptionInfo,
        name: &str,
    ) -> Result<NameAvailability, Report<ArmError>> {
        self.record(format!("check_name_available({name})"));
        let taken = lock(&self.resources).iter().any(|r| r.name == name);
        Ok(NameAvailability {
            available: !taken,
            reason: taken.then(|| "SubdomainAlreadyExists".to_string()),
        })
    }
}

/// Account manager, prompter and fake cloud wired together.
pub(crate) struct Fixture {
    pub(crate) account: Arc<AccountManager>,
    pub(crate) prompter: Arc<Scripted>,
    pub(crate) cloud: Arc<FakeCloud>,
}

impl Fixture {
    /// Signed in as `jane@contoso.com`.
    pub(crate) fn new(subscriptions: Vec<SubscriptionInfo>, prompter: Scripted) -> Self {
        Self::build(subscriptions, prompter, true)
    }

    /// Signed out; a login succeeds once confirmed.
    pub(crate) fn signed_out(prompter: Scripted) -> Self {
        Self::build(
            vec![SubscriptionInfo::new("s1", "t1", "Contoso")],
            prompter,
            false,
        )
    }

    fn build(subscriptions: Vec<SubscriptionInfo>, prompter: Scripted, signed_in: bool) -> Self {
        let prompter = Arc::new(prompter);
        let provider = Arc::new(FakeProvider {
            signed_in: Mutex::new(signed_in),
        });
        Self {
            account: Arc::new(AccountManager::new(provider, prompter.clone())),
            prompter,
            cloud: Arc::new(FakeCloud::new(subscriptions)),
        }
    }

    pub(crate) fn with_groups(self, groups: &[&str]) -> Self {
        *lock(&self.cloud.groups) = groups
            .iter()
            .map(|g| ResourceGroupInfo::new(*g, "eastus"))
            .collect();
        self
    }

    pub(crate) fn with_regions(self, regions: Vec<&str>) -> Self {
        *lock(&self.cloud.regions) = regions.into_iter().map(str::to_string).collect();
        self
    }

    pub(crate) fn with_skus(self, skus: Vec<(&str, &str)>) -> Self {
        *lock(&self.cloud.skus) = skus
            .into_iter()
            .map(|(name, tier)| SkuOption::new(name, tier))
            .collect();
        self
    }

    pub(crate) fn with_resources(self, resources: Vec<AzureResourceInfo>) -> Self {
        *lock(&self.cloud.resources) = resources;
        self
    }

    pub(crate) fn with_instance_details(self, details: InstanceDetails) -> Self {
        lock(&self.cloud.details).push(details);
        self
    }

    pub(crate) fn failing_create(self, err: ArmError) -> Self {
        *lock(&self.cloud.create_failure) = Some(err);
        self
    }

    /// The first fake subscription.
    pub(crate) fn subscription(&self) -> SubscriptionInfo {
        self.cloud
            .subscriptions
            .first()
            .cloned()
            .unwrap_or_else(|| SubscriptionInfo::new("s1", "t1", "Contoso"))
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        lock(&self.cloud.calls).clone()
    }

    pub(crate) fn resolver(&self) -> SelectionResolver {
        SelectionResolver::new(
            self.account.clone(),
            self.cloud.clone(),
            self.cloud.clone(),
            self.cloud.clone(),
            self.prompter.clone(),
        )
    }
}
