//! Core domain types and utilities for speechkit.
//!
//! This crate provides the data model shared by every provisioning
//! component (subscriptions, resource groups, Cognitive Services accounts,
//! credentials), the `Result` alias, and the abstract [`Prompter`] through
//! which the workflow asks the user to decide.

pub mod credentials;
pub mod error;
pub mod id;
pub mod prompt;
pub mod resource;
pub mod subscription;

pub use credentials::{Credentials, normalize_region};
pub use error::Result;
pub use id::{OperationId, ParseIdError, SubscriptionId, TenantId};
pub use prompt::{Choice, InputConfig, OptionItem, PromptError, Prompter, SelectConfig};
pub use resource::{
    AccountType, AzureResourceInfo, COGNITIVE_SERVICES_NAMESPACE, ResourceId, SkuOption,
};
pub use subscription::{ResourceGroupInfo, SubscriptionInfo};
