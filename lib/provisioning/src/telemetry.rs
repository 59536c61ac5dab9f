//! Outcome events of top-level operations.
//!
//! Each operation reports exactly one [`Outcome`]. Properties describe the
//! resource that was touched; key material is never part of an event.

use rootcause::Report;
use speechkit_core::{AzureResourceInfo, OperationId, SubscriptionInfo};
use std::fmt;
use tracing::info;

use crate::error::{ErrorType, ProvisioningError};

/// Target of the structured outcome events.
pub const TELEMETRY_TARGET: &str = "speechkit::telemetry";

/// Top-level operations that report an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryEvent {
    AzureLogin,
    CreateAzureAiService,
    ConfigureResource,
}

impl TelemetryEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AzureLogin => "azure-login",
            Self::CreateAzureAiService => "create-azure-ai-service",
            Self::ConfigureResource => "configure-resource",
        }
    }
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Cancelled,
    Failed {
        error_code: String,
        error_type: ErrorType,
        message: String,
    },
}

impl Outcome {
    /// Classifies the result of an operation.
    #[must_use]
    pub fn of<T>(result: &Result<T, Report<ProvisioningError>>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => Self::from_error(err.current_context()),
        }
    }

    #[must_use]
    pub fn from_error(err: &ProvisioningError) -> Self {
        if err.is_cancellation() {
            return Self::Cancelled;
        }
        Self::Failed {
            error_code: err.error_code(),
            error_type: err.error_type(),
            message: err.to_string(),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Resource details attached to an outcome event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventProperties {
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub service_region: Option<String>,
    pub speech_resource_sku: Option<String>,
    pub speech_resource_name: Option<String>,
}

impl EventProperties {
    #[must_use]
    pub fn for_subscription(subscription: &SubscriptionInfo) -> Self {
        Self {
            subscription_id: Some(subscription.id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_resource(resource: &AzureResourceInfo) -> Self {
        Self {
            subscription_id: Some(resource.subscription_id.to_string()),
            resource_group: resource.id.resource_group().map(str::to_string),
            service_region: Some(resource.region.clone()),
            speech_resource_sku: Some(resource.sku.clone()),
            speech_resource_name: Some(resource.name.clone()),
        }
    }
}

/// Receives outcome events.
pub trait TelemetrySink: Send + Sync {
    fn record(
        &self,
        operation: OperationId,
        event: TelemetryEvent,
        outcome: &Outcome,
        properties: &EventProperties,
    );
}

/// Emits outcome events as `tracing` events on [`TELEMETRY_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(
        &self,
        operation: OperationId,
        event: TelemetryEvent,
        outcome: &Outcome,
        properties: &EventProperties,
    ) {
        let (error_code, error_type, error_message) = match outcome {
            Outcome::Failed {
                error_code,
                error_type,
                message,
            } => (
                Some(error_code.as_str()),
                Some(error_type.as_str()),
                Some(message.as_str()),
            ),
            _ => (None, None, None),
        };
        info!(
            target: TELEMETRY_TARGET,
            %operation,
            event = event.as_str(),
            outcome = outcome.as_str(),
            error_code,
            error_type,
            error_message,
            subscription_id = properties.subscription_id.as_deref(),
            resource_group = properties.resource_group.as_deref(),
            service_region = properties.service_region.as_deref(),
            speech_resource_sku = properties.speech_resource_sku.as_deref(),
            speech_resource_name = properties.speech_resource_name.as_deref(),
            "operation finished"
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use speechkit_arm::ArmError;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Sink keeping every event for assertions.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) events: Arc<Mutex<Vec<(TelemetryEvent, Outcome, EventProperties)>>>,
    }

    impl RecordingSink {
        pub(crate) fn events(&self) -> Vec<(TelemetryEvent, Outcome, EventProperties)> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn record(
            &self,
            _operation: OperationId,
            event: TelemetryEvent,
            outcome: &Outcome,
            properties: &EventProperties,
        ) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((event, outcome.clone(), properties.clone()));
        }
    }

    #[test]
    fn outcome_classification() {
        let ok: Result<(), Report<ProvisioningError>> = Ok(());
        assert_eq!(Outcome::of(&ok), Outcome::Success);

        let cancelled: Result<(), Report<ProvisioningError>> =
            Err(ProvisioningError::UserCancelled.into());
        assert_eq!(Outcome::of(&cancelled), Outcome::Cancelled);

        let failed: Result<(), Report<ProvisioningError>> = Err(ProvisioningError::Arm(
            ArmError::MissingKeyOrRegion {
                name: "speech1".to_string(),
            },
        )
        .into());
        let Outcome::Failed {
            error_code,
            error_type,
            ..
        } = Outcome::of(&failed)
        else {
            panic!("expected failure");
        };
        assert_eq!(error_code, "arm.MissingKeyOrRegion");
        assert_eq!(error_type, ErrorType::User);
    }

    #[test]
    fn event_names() {
        assert_eq!(TelemetryEvent::AzureLogin.to_string(), "azure-login");
        assert_eq!(
            TelemetryEvent::CreateAzureAiService.as_str(),
            "create-azure-ai-service"
        );
        assert_eq!(TelemetryEvent::ConfigureResource.as_str(), "configure-resource");
    }
}
