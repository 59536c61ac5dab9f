//! Subscription and resource-group snapshots.

use crate::id::{SubscriptionId, TenantId};
use serde::{Deserialize, Serialize};

/// A subscription visible to the signed-in identity.
///
/// Calls scoped to the subscription must use `tenant_id`; ARM rejects
/// tokens minted for any other tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
}

impl SubscriptionInfo {
    #[must_use]
    pub fn new(
        id: impl Into<SubscriptionId>,
        tenant_id: impl Into<TenantId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
        }
    }
}

/// A resource group within a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupInfo {
    pub name: String,
    pub location: String,
}

impl ResourceGroupInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}
