//! Interactive resolution of a subscription, resource group, region, name
//! and pricing tier.
//!
//! Every step either resolves on its own (a single candidate) or asks the
//! [`Prompter`]. A cancelled prompt aborts the whole resolution with
//! [`ProvisioningError::UserCancelled`]; nothing here creates anything.

use chrono::{DateTime, Utc};
use rootcause::Report;
use speechkit_arm::{AccountDirectory, InvalidName, ResourceInstances, ResourceManagement};
use speechkit_core::{
    AccountType, AzureResourceInfo, Choice, InputConfig, OptionItem, PromptError, Prompter,
    ResourceGroupInfo, SelectConfig, SubscriptionId, SubscriptionInfo,
};
use speechkit_identity::{AccountClaims, AccountManager};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::ProvisioningError;

pub const CREATE_RESOURCE_GROUP_ID: &str = "create-new-resource-group";
pub const CREATE_SERVICE_ID: &str = "create-new-service";

const CREATE_RESOURCE_GROUP_LABEL: &str = "+ Create a new Resource Group";
const CREATE_SERVICE_LABEL: &str = "+ Create a new Azure AI Service";

const RESOURCE_GROUP_PROMPT: &str = "Enter a resource group name or use the default one";
const INSTANCE_PROMPT: &str = "Enter a name for the Azure AI Service instance or use the default one";

/// Username used in default names when the account has none.
const FALLBACK_USERNAME: &str = "dummy";

/// Progress of one new-instance resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unauthenticated,
    SubscriptionChosen,
    ResourceGroupChosen,
    RegionChosen,
    NameChosen,
    SkuChosen,
    Ready,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::SubscriptionChosen => "subscription-chosen",
            Self::ResourceGroupChosen => "resource-group-chosen",
            Self::RegionChosen => "region-chosen",
            Self::NameChosen => "name-chosen",
            Self::SkuChosen => "sku-chosen",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// The resource group a new instance goes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceGroupChoice {
    Existing(ResourceGroupInfo),
    /// A name that passed validation and does not exist yet.
    New(String),
}

impl ResourceGroupChoice {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Existing(group) => &group.name,
            Self::New(name) => name,
        }
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// Answer of the resource picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChoice {
    CreateNew,
    Existing(AzureResourceInfo),
}

/// Everything needed to create an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstancePlan {
    pub subscription: SubscriptionInfo,
    pub resource_group: ResourceGroupChoice,
    pub region: String,
    pub name: String,
    /// The pricing tier exactly as chosen, e.g. `"S0 Standard"`.
    pub sku: String,
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// `{user}_speechaiproj_rg_{YYYYMMDDHHmmss}`, using only characters a
/// resource-group name allows.
#[must_use]
pub fn default_resource_group_name(username: Option<&str>, now: DateTime<Utc>) -> String {
    let user: String = username
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')'))
        .take(59)
        .collect();
    let user = if user.is_empty() { FALLBACK_USERNAME } else { &user };
    format!("{user}_speechaiproj_rg_{}", timestamp(now))
}

/// `{user}-speechaiproj-ais-{YYYYMMDDHHmmss}`, lower-cased with every other
/// character turned into a single hyphen.
#[must_use]
pub fn default_instance_name(username: Option<&str>, now: DateTime<Utc>) -> String {
    let mut user = String::new();
    for c in username.unwrap_or_default().chars() {
        if c.is_ascii_alphanumeric() {
            user.push(c.to_ascii_lowercase());
        } else if !user.is_empty() && !user.ends_with('-') {
            user.push('-');
        }
    }
    let user: String = user.trim_end_matches('-').chars().take(31).collect();
    let user = user.trim_end_matches('-');
    let user = if user.is_empty() { FALLBACK_USERNAME } else { user };
    format!("{user}-speechaiproj-ais-{}", timestamp(now))
}

/// Walks the user through choosing or naming each piece of a speech resource.
pub struct SelectionResolver {
    account: Arc<AccountManager>,
    directory: Arc<dyn AccountDirectory>,
    management: Arc<dyn ResourceManagement>,
    instances: Arc<dyn ResourceInstances>,
    prompter: Arc<dyn Prompter>,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl SelectionResolver {
    #[must_use]
    pub fn new(
        account: Arc<AccountManager>,
        directory: Arc<dyn AccountDirectory>,
        management: Arc<dyn ResourceManagement>,
        instances: Arc<dyn ResourceInstances>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            account,
            directory,
            management,
            instances,
            prompter,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the clock used to timestamp default names.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub fn account(&self) -> &Arc<AccountManager> {
        &self.account
    }

    /// Re-checks that an account is signed in, without prompting.
    ///
    /// # Errors
    ///
    /// `Identity(NotSignedIn)` when the account signed out in the meantime.
    pub async fn require_login(&self) -> Result<AccountClaims, Report<ProvisioningError>> {
        Ok(self
            .account
            .ensure_signed_in(false)
            .await
            .map_err(ProvisioningError::identity)?)
    }

    /// The selected subscription, choosing one first if needed.
    ///
    /// A single subscription is selected without asking.
    ///
    /// # Errors
    ///
    /// `NoSubscriptionFound` when the account has none, `UserCancelled`
    /// when the picker is dismissed, listing errors otherwise.
    #[instrument(skip(self))]
    pub async fn get_selected_subscription(
        &self,
        trigger_login: bool,
    ) -> Result<SubscriptionInfo, Report<ProvisioningError>> {
        self.account
            .ensure_signed_in(trigger_login)
            .await
            .map_err(ProvisioningError::identity)?;
        if let Some(subscription) = self.account.selected_subscription() {
            return Ok(subscription);
        }

        let mut subscriptions = self.list_subscriptions().await?;
        let chosen = match subscriptions.len() {
            0 => return Err(ProvisioningError::NoSubscriptionFound.into()),
            1 => subscriptions.remove(0),
            _ => {
                let picker = SelectConfig::new(
                    "subscription",
                    "Select Subscription",
                    subscriptions
                        .iter()
                        .map(|s| OptionItem::new(s.id.as_str(), s.name.as_str()))
                        .collect(),
                );
                let id = self.select(&picker).await?;
                subscriptions
                    .into_iter()
                    .find(|s| s.id.as_str() == id)
                    .ok_or_else(|| ProvisioningError::Prompt(PromptError::InvalidAnswer { answer: id }))?
            }
        };

        info!(subscription = %chosen.id, "subscription selected");
        self.account.select_subscription(chosen.clone());
        Ok(chosen)
    }

    /// Every subscription the signed-in account can reach.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is signed out or listing fails.
    pub async fn list_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, Report<ProvisioningError>> {
        self.require_login().await?;
        Ok(self
            .directory
            .list_subscriptions()
            .await
            .map_err(ProvisioningError::arm)?)
    }

    /// Selects the subscription with `id`.
    ///
    /// # Errors
    ///
    /// `UnknownSubscription` when the account cannot see `id`.
    pub async fn set_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<SubscriptionInfo, Report<ProvisioningError>> {
        let subscription = self
            .list_subscriptions()
            .await?
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| ProvisioningError::UnknownSubscription { id: id.to_string() })?;
        self.account.select_subscription(subscription.clone());
        Ok(subscription)
    }

    /// Resolves everything `create_instance` needs, in a fixed order:
    /// resource group, region, name, pricing tier.
    ///
    /// # Errors
    ///
    /// `UserCancelled` at any dismissed prompt; lookup errors otherwise.
    #[instrument(skip(self, subscription), fields(subscription = %subscription.id))]
    pub async fn resolve_new_instance(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<NewInstancePlan, Report<ProvisioningError>> {
        let mut state = ResolutionState::Unauthenticated;
        self.require_login().await?;
        advance(&mut state, ResolutionState::SubscriptionChosen);

        let resource_group = self.choose_resource_group(subscription).await?;
        advance(&mut state, ResolutionState::ResourceGroupChosen);

        let region = self.choose_region(subscription).await?;
        advance(&mut state, ResolutionState::RegionChosen);

        let name = self.prompt_instance_name(subscription).await?;
        advance(&mut state, ResolutionState::NameChosen);

        let sku = self.choose_sku(subscription, &region).await?;
        advance(&mut state, ResolutionState::SkuChosen);

        advance(&mut state, ResolutionState::Ready);
        Ok(NewInstancePlan {
            subscription: subscription.clone(),
            resource_group,
            region,
            name,
            sku,
        })
    }

    /// Picks an existing resource group or names a new one.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when either prompt is dismissed.
    pub async fn choose_resource_group(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<ResourceGroupChoice, Report<ProvisioningError>> {
        self.require_login().await?;
        let groups = self
            .management
            .list_resource_groups(subscription)
            .await
            .map_err(ProvisioningError::arm)?;
        let picker = SelectConfig::new(
            "Resource Group",
            "Select a resource group",
            groups
                .iter()
                .map(|g| OptionItem::new(g.name.as_str(), g.name.as_str()))
                .collect(),
        );
        let choice = self
            .prompter
            .choose_or_create(
                &picker,
                OptionItem::new(CREATE_RESOURCE_GROUP_ID, CREATE_RESOURCE_GROUP_LABEL),
            )
            .await
            .map_err(ProvisioningError::prompt)?
            .ok_or(ProvisioningError::UserCancelled)?;

        match choice {
            Choice::CreateNew => Ok(ResourceGroupChoice::New(
                self.prompt_resource_group_name(subscription).await?,
            )),
            Choice::Existing(id) => groups
                .into_iter()
                .find(|g| g.name == id)
                .map(ResourceGroupChoice::Existing)
                .ok_or_else(|| {
                    ProvisioningError::Prompt(PromptError::InvalidAnswer { answer: id }).into()
                }),
        }
    }

    /// Asks for a new resource-group name until a valid one is entered.
    ///
    /// The default name is looked up once before asking, so a missing
    /// permission fails here instead of after the user typed a name.
    ///
    /// # Errors
    ///
    /// `UserCancelled` on a dismissed or empty answer.
    pub async fn prompt_resource_group_name(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<String, Report<ProvisioningError>> {
        let claims = self.require_login().await?;
        let default = default_resource_group_name(claims.username(), (self.clock)());
        self.management
            .check_resource_group_exists(subscription, &default)
            .await
            .map_err(ProvisioningError::arm)?;

        let mut message = None;
        loop {
            let config = InputConfig::new(RESOURCE_GROUP_PROMPT)
                .with_default(default.as_str())
                .with_validation_message(message.take());
            let name = self.input(&config).await?;
            match self
                .management
                .validate_resource_group_name(subscription, &name)
                .await
                .map_err(ProvisioningError::arm)?
            {
                None => return Ok(name),
                Some(invalid) => message = Some(rejection(&invalid)),
            }
        }
    }

    /// Picks a region offering the target account kind.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when the picker is dismissed.
    pub async fn choose_region(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<String, Report<ProvisioningError>> {
        self.require_login().await?;
        let mut regions = self
            .management
            .list_available_regions(subscription)
            .await
            .map_err(ProvisioningError::arm)?;
        if regions.len() == 1 {
            return Ok(regions.remove(0));
        }
        let picker = SelectConfig::new(
            "Region",
            "Select a region",
            regions
                .iter()
                .map(|r| OptionItem::new(r.as_str(), r.as_str()))
                .collect(),
        );
        self.select(&picker).await
    }

    /// Asks for a new instance name until a valid, available one is entered.
    ///
    /// # Errors
    ///
    /// `UserCancelled` on a dismissed or empty answer.
    pub async fn prompt_instance_name(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<String, Report<ProvisioningError>> {
        let claims = self.require_login().await?;
        let default = default_instance_name(claims.username(), (self.clock)());

        let mut message = None;
        loop {
            let config = InputConfig::new(INSTANCE_PROMPT)
                .with_default(default.as_str())
                .with_validation_message(message.take());
            let name = self.input(&config).await?;
            match self
                .instances
                .validate_instance_name(subscription, &name)
                .await
                .map_err(ProvisioningError::arm)?
            {
                None => return Ok(name),
                Some(invalid) => message = Some(rejection(&invalid)),
            }
        }
    }

    /// Picks a pricing tier available in `region`.
    ///
    /// # Errors
    ///
    /// `Arm(NoPricingTierAvailable)` when the region offers none,
    /// `UserCancelled` when the picker is dismissed.
    pub async fn choose_sku(
        &self,
        subscription: &SubscriptionInfo,
        region: &str,
    ) -> Result<String, Report<ProvisioningError>> {
        self.require_login().await?;
        let skus = self
            .management
            .list_available_skus(subscription, region)
            .await
            .map_err(ProvisioningError::arm)?;
        let labels: Vec<String> = skus.iter().map(ToString::to_string).collect();
        if let [only] = labels.as_slice() {
            return Ok(only.clone());
        }
        let picker = SelectConfig::new(
            "Pricing Tier",
            "Select a pricing tier",
            labels
                .iter()
                .map(|s| OptionItem::new(s.as_str(), s.as_str()))
                .collect(),
        );
        self.select(&picker).await
    }

    /// Speech-capable resources of `subscription`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is signed out or listing fails.
    pub async fn list_speech_resources(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Vec<AzureResourceInfo>, Report<ProvisioningError>> {
        self.require_login().await?;
        Ok(self
            .instances
            .list_instances(subscription, &AccountType::ALL)
            .await
            .map_err(ProvisioningError::arm)?)
    }

    fn resource_picker(resources: &[AzureResourceInfo]) -> SelectConfig {
        SelectConfig::new(
            "Azure Speech Resource",
            "Select a Speech Resource",
            resources
                .iter()
                .map(|r| OptionItem::new(r.id.as_str(), r.label()))
                .collect(),
        )
    }

    /// Picks one of the speech-capable resources, or `None` if there are none.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when the picker is dismissed.
    pub async fn choose_existing_resource(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Option<AzureResourceInfo>, Report<ProvisioningError>> {
        let mut resources = self.list_speech_resources(subscription).await?;
        match resources.len() {
            0 => Ok(None),
            1 => Ok(Some(resources.remove(0))),
            _ => {
                let id = self.select(&Self::resource_picker(&resources)).await?;
                find_resource(resources, id).map(Some)
            }
        }
    }

    /// Picks a speech-capable resource or the "create new" entry.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when the picker is dismissed.
    pub async fn choose_resource(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<ResourceChoice, Report<ProvisioningError>> {
        let resources = self.list_speech_resources(subscription).await?;
        let choice = self
            .prompter
            .choose_or_create(
                &Self::resource_picker(&resources),
                OptionItem::new(CREATE_SERVICE_ID, CREATE_SERVICE_LABEL),
            )
            .await
            .map_err(ProvisioningError::prompt)?
            .ok_or(ProvisioningError::UserCancelled)?;
        match choice {
            Choice::CreateNew => Ok(ResourceChoice::CreateNew),
            Choice::Existing(id) => find_resource(resources, id).map(ResourceChoice::Existing),
        }
    }

    async fn select(&self, picker: &SelectConfig) -> Result<String, Report<ProvisioningError>> {
        Ok(self
            .prompter
            .choose_one(picker)
            .await
            .map_err(ProvisioningError::prompt)?
            .ok_or(ProvisioningError::UserCancelled)?)
    }

    /// Trimmed input; dismissing or answering with nothing cancels.
    async fn input(&self, config: &InputConfig) -> Result<String, Report<ProvisioningError>> {
        let answer = self
            .prompter
            .input_text(config)
            .await
            .map_err(ProvisioningError::prompt)?
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(ProvisioningError::UserCancelled)?;
        Ok(answer)
    }
}

fn advance(state: &mut ResolutionState, next: ResolutionState) {
    debug!(from = %state, to = %next, "resolution advanced");
    *state = next;
}

fn rejection(invalid: &InvalidName) -> String {
    debug!(reason = %invalid, "name rejected");
    invalid.to_string()
}

fn find_resource(
    resources: Vec<AzureResourceInfo>,
    id: String,
) -> Result<AzureResourceInfo, Report<ProvisioningError>> {
    resources
        .into_iter()
        .find(|r| r.id.as_str() == id)
        .ok_or_else(|| ProvisioningError::Prompt(PromptError::InvalidAnswer { answer: id }).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, Scripted, speech_resource};
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 34, 56)
            .single()
            .expect("valid time")
    }

    #[test]
    fn default_names_follow_the_pattern() {
        assert_eq!(
            default_resource_group_name(Some("jane.doe"), noon()),
            "jane.doe_speechaiproj_rg_20240517123456"
        );
        assert_eq!(
            default_instance_name(Some("Jane.Doe__x"), noon()),
            "jane-doe-x-speechaiproj-ais-20240517123456"
        );
    }

    #[test]
    fn empty_usernames_fall_back() {
        assert_eq!(
            default_resource_group_name(None, noon()),
            "dummy_speechaiproj_rg_20240517123456"
        );
        assert_eq!(
            default_instance_name(Some("..."), noon()),
            "dummy-speechaiproj-ais-20240517123456"
        );
    }

    #[test]
    fn default_names_pass_validation() {
        let long = "a".repeat(80);
        let rg = default_resource_group_name(Some(&long), noon());
        assert!(speechkit_arm::check_resource_group_name(&rg).is_ok());
        let instance = default_instance_name(Some(&long), noon());
        assert!(speechkit_arm::check_instance_name(&instance).is_ok());
    }

    #[tokio::test]
    async fn single_subscription_is_selected_without_prompt() {
        let fixture = Fixture::new(vec![SubscriptionInfo::new("s1", "t1", "Contoso")], Scripted::new());

        let subscription = fixture
            .resolver()
            .get_selected_subscription(false)
            .await
            .expect("subscription");

        assert_eq!(subscription.id.as_str(), "s1");
        assert!(fixture.prompter.selects().is_empty());
        assert_eq!(
            fixture.account.selected_subscription().map(|s| s.id),
            Some("s1".into())
        );
    }

    #[tokio::test]
    async fn no_subscription_is_a_domain_error() {
        let fixture = Fixture::new(Vec::new(), Scripted::new());

        let err = fixture
            .resolver()
            .get_selected_subscription(false)
            .await
            .unwrap_err();

        assert_eq!(err.current_context(), &ProvisioningError::NoSubscriptionFound);
        assert_eq!(err.current_context().to_string(), "We couldn't find a subscription.");
    }

    #[tokio::test]
    async fn several_subscriptions_prompt_by_name() {
        let fixture = Fixture::new(
            vec![
                SubscriptionInfo::new("s1", "t1", "Contoso"),
                SubscriptionInfo::new("s2", "t2", "Fabrikam"),
            ],
            Scripted::new().select("s2"),
        );

        let subscription = fixture
            .resolver()
            .get_selected_subscription(false)
            .await
            .expect("subscription");

        assert_eq!(subscription.tenant_id.as_str(), "t2");
        let selects = fixture.prompter.selects();
        assert_eq!(selects[0].title, "Select Subscription");
        assert_eq!(selects[0].options[1].label, "Fabrikam");
    }

    #[tokio::test]
    async fn unknown_subscription_is_rejected() {
        let fixture = Fixture::new(vec![SubscriptionInfo::new("s1", "t1", "Contoso")], Scripted::new());

        let err = fixture
            .resolver()
            .set_subscription(&"s9".into())
            .await
            .unwrap_err();

        assert!(matches!(
            err.current_context(),
            ProvisioningError::UnknownSubscription { .. }
        ));
        assert_eq!(fixture.account.selected_subscription(), None);
    }

    #[tokio::test]
    async fn invalid_names_are_reprompted_with_the_reason() {
        let fixture = Fixture::new(
            vec![SubscriptionInfo::new("s1", "t1", "Contoso")],
            Scripted::new()
                .input("Bad--Name")
                .input("  good-name  "),
        );
        let subscription = fixture.subscription();

        let name = fixture
            .resolver()
            .prompt_instance_name(&subscription)
            .await
            .expect("name");

        assert_eq!(name, "good-name");
        let inputs = fixture.prompter.inputs();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].validation_message, None);
        assert!(inputs[1].validation_message.is_some());
        // Only the syntactically valid name reached the availability check.
        assert_eq!(fixture.calls(), vec!["check_name_available(good-name)"]);
    }

    #[tokio::test]
    async fn empty_input_cancels() {
        let fixture = Fixture::new(
            vec![SubscriptionInfo::new("s1", "t1", "Contoso")],
            Scripted::new().input("   "),
        );

        let err = fixture
            .resolver()
            .prompt_instance_name(&fixture.subscription())
            .await
            .unwrap_err();

        assert_eq!(err.current_context(), &ProvisioningError::UserCancelled);
    }

    #[tokio::test]
    async fn default_resource_group_name_is_checked_before_asking() {
        let fixture = Fixture::new(
            vec![SubscriptionInfo::new("s1", "t1", "Contoso")],
            Scripted::new().accept_default(),
        );

        let name = fixture
            .resolver()
            .with_clock(noon)
            .prompt_resource_group_name(&fixture.subscription())
            .await
            .expect("name");

        assert_eq!(name, "jane_speechaiproj_rg_20240517123456");
        let calls = fixture.calls();
        assert_eq!(
            calls,
            vec![
                "check_resource_group_exists(jane_speechaiproj_rg_20240517123456)",
                "check_resource_group_exists(jane_speechaiproj_rg_20240517123456)",
            ]
        );
    }

    #[tokio::test]
    async fn resource_picker_prepends_create_option() {
        let fixture = Fixture::new(
            vec![SubscriptionInfo::new("s1", "t1", "Contoso")],
            Scripted::new().select(CREATE_SERVICE_ID),
        )
        .with_resources(vec![speech_resource("speech1")]);

        let choice = fixture
            .resolver()
            .choose_resource(&fixture.subscription())
            .await
            .expect("choice");

        assert_eq!(choice, ResourceChoice::CreateNew);
        let picker = &fixture.prompter.selects()[0];
        assert_eq!(picker.title, "Select a Speech Resource");
        assert_eq!(picker.options[0].id, CREATE_SERVICE_ID);
        assert_eq!(picker.options[1].label, "speech1 (Speech Service, eastus, S0)");
    }

    #[tokio::test]
    async fn single_region_and_sku_resolve_without_prompt() {
        let fixture = Fixture::new(vec![SubscriptionInfo::new("s1", "t1", "Contoso")], Scripted::new())
            .with_regions(vec!["westeurope"])
            .with_skus(vec![("F0", "Free")]);
        let subscription = fixture.subscription();
        let resolver = fixture.resolver();

        assert_eq!(resolver.choose_region(&subscription).await.expect("region"), "westeurope");
        assert_eq!(
            resolver.choose_sku(&subscription, "westeurope").await.expect("sku"),
            "F0 Free"
        );
        assert!(fixture.prompter.selects().is_empty());
    }

    #[tokio::test]
    async fn signed_out_account_is_refused() {
        let fixture = Fixture::signed_out(Scripted::new());

        let err = fixture
            .resolver()
            .choose_region(&SubscriptionInfo::new("s1", "t1", "Contoso"))
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &ProvisioningError::Identity(speechkit_identity::IdentityError::NotSignedIn)
        );
        assert!(fixture.calls().is_empty());
    }
}
