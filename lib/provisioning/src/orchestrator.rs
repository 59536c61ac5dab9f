//! Top-level provisioning operations.
//!
//! The orchestrator sequences the [`SelectionResolver`] with the mutating
//! ARM calls and the project file writes. Each public operation that maps to
//! a user action reports exactly one [`Outcome`] to the [`TelemetrySink`].

use rootcause::Report;
use speechkit_arm::{ArmError, InstanceDetails, ResourceInstances, ResourceManagement, RetryPolicy};
use speechkit_core::{
    AzureResourceInfo, Credentials, OperationId, ResourceId, SubscriptionInfo,
};
use speechkit_envsync::{ProjectLayout, SyncReport};
use speechkit_identity::{AccountClaims, AccountManager, LoginStatus};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::ProvisioningError;
use crate::resolver::{NewInstancePlan, ResourceChoice, ResourceGroupChoice, SelectionResolver};
use crate::telemetry::{EventProperties, Outcome, TelemetryEvent, TelemetrySink};

/// Result of [`ProvisioningOrchestrator::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureReport {
    pub resource: AzureResourceInfo,
    pub files: SyncReport,
}

/// Runs sign-in, selection, creation and project configuration.
pub struct ProvisioningOrchestrator {
    resolver: SelectionResolver,
    management: Arc<dyn ResourceManagement>,
    instances: Arc<dyn ResourceInstances>,
    telemetry: Arc<dyn TelemetrySink>,
    layout: ProjectLayout,
    resource_group_policy: RetryPolicy,
}

impl ProvisioningOrchestrator {
    #[must_use]
    pub fn new(
        resolver: SelectionResolver,
        management: Arc<dyn ResourceManagement>,
        instances: Arc<dyn ResourceInstances>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            resolver,
            management,
            instances,
            telemetry,
            layout: ProjectLayout::default(),
            resource_group_policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: ProjectLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Polling used while a new resource group becomes visible.
    #[must_use]
    pub fn with_resource_group_policy(mut self, policy: RetryPolicy) -> Self {
        self.resource_group_policy = policy;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &SelectionResolver {
        &self.resolver
    }

    #[must_use]
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    fn account(&self) -> &AccountManager {
        self.resolver.account()
    }

    fn report<T>(
        &self,
        operation: OperationId,
        event: TelemetryEvent,
        result: &Result<T, Report<ProvisioningError>>,
        properties: &EventProperties,
    ) {
        let outcome = Outcome::of(result);
        self.telemetry.record(operation, event, &outcome, properties);
    }

    /// Restores a cached sign-in and reports the login state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session provider fails.
    pub async fn status(&self) -> Result<LoginStatus, Report<ProvisioningError>> {
        Ok(self
            .account()
            .initialize()
            .await
            .map_err(ProvisioningError::identity)?)
    }

    /// Signs in after the user confirms.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when the confirmation is declined, `LoginTimeout` when
    /// the sign-in is not completed in time.
    pub async fn login(&self) -> Result<AccountClaims, Report<ProvisioningError>> {
        let operation = OperationId::new();
        let result: Result<_, Report<ProvisioningError>> = self
            .account()
            .login(true)
            .await
            .map_err(|e| ProvisioningError::identity(e).into());
        self.report(
            operation,
            TelemetryEvent::AzureLogin,
            &result,
            &EventProperties::default(),
        );
        result
    }

    /// Signs out after the user confirms. Returns false when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt or the provider fails.
    pub async fn logout(&self) -> Result<bool, Report<ProvisioningError>> {
        Ok(self
            .account()
            .logout()
            .await
            .map_err(ProvisioningError::identity)?)
    }

    /// Resolves a new instance and creates it, resource group first.
    ///
    /// A resource group created before a later failure stays in place.
    ///
    /// # Errors
    ///
    /// `UserCancelled` at any dismissed prompt; ARM failures otherwise.
    #[instrument(skip(self, subscription), fields(subscription = %subscription.id))]
    pub async fn create_new(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<AzureResourceInfo, Report<ProvisioningError>> {
        let operation = OperationId::new();
        let mut properties = EventProperties::for_subscription(subscription);
        let result = self.create_new_inner(subscription, &mut properties).await;
        self.report(
            operation,
            TelemetryEvent::CreateAzureAiService,
            &result,
            &properties,
        );
        result
    }

    async fn create_new_inner(
        &self,
        subscription: &SubscriptionInfo,
        properties: &mut EventProperties,
    ) -> Result<AzureResourceInfo, Report<ProvisioningError>> {
        let plan = self.resolver.resolve_new_instance(subscription).await?;
        properties.resource_group = Some(plan.resource_group.name().to_string());
        properties.service_region = Some(plan.region.clone());
        properties.speech_resource_sku = Some(plan.sku.clone());
        properties.speech_resource_name = Some(plan.name.clone());

        let result = self.provision(&plan).await;
        if let (Err(err), ResourceGroupChoice::New(group)) = (&result, &plan.resource_group) {
            warn!(
                resource_group = %group,
                error = %err.current_context(),
                "resource group left in place after a failed creation"
            );
        }
        let resource = result?;

        info!(resource = %resource.id, "speech resource created");
        *properties = EventProperties::for_resource(&resource);
        self.account().select_resource(resource.clone());
        Ok(resource)
    }

    async fn provision(
        &self,
        plan: &NewInstancePlan,
    ) -> Result<AzureResourceInfo, Report<ProvisioningError>> {
        self.resolver.require_login().await?;
        self.management
            .ensure_resource_group(
                &plan.subscription,
                plan.resource_group.name(),
                &plan.region,
                self.resource_group_policy,
            )
            .await
            .map_err(ProvisioningError::arm)?;

        self.resolver.require_login().await?;
        Ok(self
            .instances
            .create_instance(
                &plan.subscription,
                plan.resource_group.name(),
                &plan.region,
                &plan.name,
                &plan.sku,
            )
            .await
            .map_err(ProvisioningError::arm)?)
    }

    /// Picks an existing speech resource; `None` when there is none.
    ///
    /// # Errors
    ///
    /// `UserCancelled` when the picker is dismissed.
    pub async fn select_existing(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<Option<AzureResourceInfo>, Report<ProvisioningError>> {
        let resource = self.resolver.choose_existing_resource(subscription).await?;
        if let Some(resource) = &resource {
            self.account().select_resource(resource.clone());
        }
        Ok(resource)
    }

    /// Picks an existing speech resource or creates a new one.
    ///
    /// # Errors
    ///
    /// `UserCancelled` at any dismissed prompt; [`create_new`](Self::create_new)
    /// errors when creating.
    pub async fn select_or_create(
        &self,
        subscription: &SubscriptionInfo,
    ) -> Result<AzureResourceInfo, Report<ProvisioningError>> {
        match self.resolver.choose_resource(subscription).await? {
            ResourceChoice::CreateNew => self.create_new(subscription).await,
            ResourceChoice::Existing(resource) => {
                self.account().select_resource(resource.clone());
                Ok(resource)
            }
        }
    }

    /// Reads the key and region of `resource`.
    ///
    /// # Errors
    ///
    /// `Arm(MissingKeyOrRegion)` when the account withholds them.
    pub async fn fetch_credentials(
        &self,
        resource: &AzureResourceInfo,
    ) -> Result<Credentials, Report<ProvisioningError>> {
        self.resolver.require_login().await?;
        Ok(self
            .instances
            .fetch_keys_and_region(resource)
            .await
            .map_err(ProvisioningError::arm)?)
    }

    /// Signs in, picks or creates a resource and writes its credentials
    /// into the project at `project`.
    ///
    /// # Errors
    ///
    /// `UserCancelled` at any dismissed prompt; any failure of the steps.
    #[instrument(skip(self, project), fields(project = %project.display()))]
    pub async fn configure(
        &self,
        project: &Path,
    ) -> Result<ConfigureReport, Report<ProvisioningError>> {
        let operation = OperationId::new();
        let mut properties = EventProperties::default();
        let result = self.configure_inner(project, &mut properties).await;
        self.report(
            operation,
            TelemetryEvent::ConfigureResource,
            &result,
            &properties,
        );
        result
    }

    async fn configure_inner(
        &self,
        project: &Path,
        properties: &mut EventProperties,
    ) -> Result<ConfigureReport, Report<ProvisioningError>> {
        let subscription = self.resolver.get_selected_subscription(true).await?;
        *properties = EventProperties::for_subscription(&subscription);

        let resource = self.select_or_create(&subscription).await?;
        *properties = EventProperties::for_resource(&resource);

        let credentials = self.fetch_credentials(&resource).await?;
        let files = self
            .layout
            .sync_credentials(project, &credentials, &resource)
            .await
            .map_err(ProvisioningError::envsync)?;
        info!(env = %files.env_path.display(), "project configured");
        Ok(ConfigureReport { resource, files })
    }

    /// Whether the project at `project` already names a usable resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the env file cannot be read.
    pub async fn is_configured(&self, project: &Path) -> Result<bool, Report<ProvisioningError>> {
        Ok(self
            .layout
            .is_resource_configured(project)
            .await
            .map_err(ProvisioningError::envsync)?)
    }

    /// Live properties of the speech resource at `id`.
    ///
    /// Selects the resource's subscription first.
    ///
    /// # Errors
    ///
    /// `UnknownSubscription` when the account cannot see the subscription,
    /// `InvalidResourceType` when the resource is not speech-capable.
    pub async fn show_resource(
        &self,
        id: &ResourceId,
    ) -> Result<InstanceDetails, Report<ProvisioningError>> {
        let subscription_id = id
            .subscription_id()
            .ok_or_else(|| ProvisioningError::Arm(ArmError::InvalidResourceId { id: id.to_string() }))?;
        let subscription = self.resolver.set_subscription(&subscription_id).await?;

        self.resolver.require_login().await?;
        let details = self
            .instances
            .get_instance(&subscription, id)
            .await
            .map_err(ProvisioningError::arm)?;
        if details.account_type().is_none() {
            return Err(ProvisioningError::InvalidResourceType {
                kind: details.kind.unwrap_or_default(),
            }
            .into());
        }
        Ok(details)
    }
}
