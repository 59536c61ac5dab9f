//! Selection and provisioning workflow for Azure AI Speech resources.
//!
//! This crate provides:
//!
//! - **Resolver**: walks the user through subscription, resource group,
//!   region, name and pricing tier, prompting only when there is a choice
//! - **Orchestrator**: sign-in, resource creation and project configuration
//! - **Telemetry**: one outcome event per top-level operation
//! - **Errors**: the user/system error taxonomy with stable error codes

pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorType, ProvisioningError};
pub use orchestrator::{ConfigureReport, ProvisioningOrchestrator};
pub use resolver::{
    CREATE_RESOURCE_GROUP_ID, CREATE_SERVICE_ID, NewInstancePlan, ResolutionState,
    ResourceChoice, ResourceGroupChoice, SelectionResolver, default_instance_name,
    default_resource_group_name,
};
pub use telemetry::{
    EventProperties, Outcome, TELEMETRY_TARGET, TelemetryEvent, TelemetrySink, TracingTelemetry,
};
