//! Azure Resource Manager access for speechkit.
//!
//! This crate provides:
//!
//! - **Client**: bearer-authenticated, throttled and retrying ARM transport
//! - **Directory**: tenants and subscriptions visible to the signed-in account
//! - **Management**: resource groups, regions and pricing tiers
//! - **Instances**: speech-capable Cognitive Services accounts and their keys
//! - **Validation**: naming rules for new resource groups and accounts

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod instances;
pub mod management;
pub mod models;
pub mod retry;
pub mod throttle;
pub mod validation;

pub use client::ArmClient;
pub use config::ArmConfig;
pub use directory::{AccountDirectory, ArmAccountDirectory, merge_subscriptions};
pub use error::ArmError;
pub use instances::{ArmResourceInstances, NameAvailability, ResourceInstances};
pub use management::{ArmResourceManagement, ResourceManagement};
pub use models::{InstanceDetails, location_key};
pub use retry::RetryPolicy;
pub use throttle::{Admission, RequestThrottle, ThrottleConfig};
pub use validation::{InvalidName, check_instance_name, check_resource_group_name};
