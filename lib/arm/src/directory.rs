//! Tenants and subscriptions visible to the signed-in account.

use async_trait::async_trait;
use rootcause::Report;
use speechkit_core::{SubscriptionId, SubscriptionInfo, TenantId};
use std::collections::HashSet;
use tracing::{instrument, warn};

use crate::client::ArmClient;
use crate::error::ArmError;
use crate::models::{SUBSCRIPTIONS_API_VERSION, SubscriptionDto, TenantDto};

/// Enumerates what the account can reach.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<TenantId>, Report<ArmError>>;

    /// Subscriptions of one tenant, listed with a token minted for it.
    async fn list_tenant_subscriptions(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<SubscriptionInfo>, Report<ArmError>>;

    /// Every reachable subscription, deduplicated by id and sorted by name.
    ///
    /// A tenant whose listing fails (consent, MFA, conditional access) is
    /// skipped with a warning rather than failing the whole listing.
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, Report<ArmError>> {
        let mut all = Vec::new();
        for tenant in self.list_tenants().await? {
            match self.list_tenant_subscriptions(&tenant).await {
                Ok(subscriptions) => all.extend(subscriptions),
                Err(err) => warn!(
                    tenant = %tenant,
                    error = %err.current_context(),
                    "skipping tenant whose subscriptions could not be listed"
                ),
            }
        }
        Ok(merge_subscriptions(all))
    }
}

/// Drops repeated ids (first one wins), then sorts by display name.
#[must_use]
pub fn merge_subscriptions(subscriptions: Vec<SubscriptionInfo>) -> Vec<SubscriptionInfo> {
    let mut seen: HashSet<SubscriptionId> = HashSet::new();
    let mut merged: Vec<SubscriptionInfo> = subscriptions
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();
    merged.sort_by(|a, b| a.name.cmp(&b.name));
    merged
}

/// [`AccountDirectory`] backed by the ARM tenants and subscriptions APIs.
#[derive(Clone)]
pub struct ArmAccountDirectory {
    client: ArmClient,
}

impl ArmAccountDirectory {
    #[must_use]
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountDirectory for ArmAccountDirectory {
    #[instrument(skip(self))]
    async fn list_tenants(&self) -> Result<Vec<TenantId>, Report<ArmError>> {
        let tenants: Vec<TenantDto> = self
            .client
            .list(None, &format!("/tenants?api-version={SUBSCRIPTIONS_API_VERSION}"))
            .await?;
        Ok(tenants
            .into_iter()
            .map(|t| TenantId::from(t.tenant_id))
            .collect())
    }

    #[instrument(skip(self), fields(tenant = %tenant_id))]
    async fn list_tenant_subscriptions(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<SubscriptionInfo>, Report<ArmError>> {
        let subscriptions: Vec<SubscriptionDto> = self
            .client
            .list(
                Some(tenant_id),
                &format!("/subscriptions?api-version={SUBSCRIPTIONS_API_VERSION}"),
            )
            .await?;
        Ok(subscriptions
            .into_iter()
            .map(|s| SubscriptionInfo::new(s.subscription_id, tenant_id.clone(), s.display_name))
            .collect())
    }
}
