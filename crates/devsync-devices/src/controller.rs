//! Per-device synchronization controller.
//!
//! The controller is the only component that moves a device through its
//! sync cycle: it accepts desired-value requests, serializes them against
//! the device's state, runs the executor on a spawned task (never on the
//! caller), commits the result, and publishes the outcome on the event bus.
//!
//! A slow or hanging executor on one device never blocks another device;
//! each request runs on its own task and the only shared state is the
//! device's own lock.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use devsync_core::{DeviceValue, EventBus, EventMetadata, HubEvent};

use crate::config::{FieldDescriptor, FieldValue};
use crate::device::Device;
use crate::executor::{ExecutionError, ExecutionRequest, ExecutionResult};
use crate::model::DeviceError;
use crate::state::{ApplyToken, CommitOutcome, SyncPhase};

/// Default bound on a single executor invocation.
pub const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// What happens when a request arrives while another is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// The new request proceeds immediately; the in-flight one is tagged
    /// stale and its eventual result discarded.
    #[default]
    Supersede,
    /// The new request is rejected with [`DeviceError::Busy`].
    SingleFlight,
}

/// Drives one device's value-synchronization cycle.
pub struct SyncController {
    device: Arc<Device>,
    event_bus: EventBus,
    timeout: Duration,
    policy: ApplyPolicy,
}

impl SyncController {
    pub fn new(device: Arc<Device>, event_bus: EventBus) -> Self {
        Self {
            device,
            event_bus,
            timeout: DEFAULT_EXECUTOR_TIMEOUT,
            policy: ApplyPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: ApplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    /// Request that the device take on a target value.
    ///
    /// Returns as soon as the request is issued; the executor runs on its
    /// own task and the outcome arrives as a `ValueChanged` or
    /// `ActionFailed` event. The executor always runs, even if the target
    /// equals the acknowledged value - internal state is never assumed to
    /// match external state.
    pub async fn request_value(&self, target: DeviceValue) -> Result<(), DeviceError> {
        let (token, request) = {
            let mut inner = self.device.inner.lock().await;
            if inner.state.is_detached() {
                return Err(DeviceError::Detached(self.device.id()));
            }
            if self.policy == ApplyPolicy::SingleFlight && inner.state.is_applying() {
                return Err(DeviceError::Busy(self.device.id()));
            }
            if inner.state.is_applying() {
                debug!(device_id = %self.device.id(), "superseding in-flight request");
            }
            let token = inner.state.begin_apply(target.clone());
            let request = ExecutionRequest {
                device_id: self.device.id(),
                target,
                config: inner.config.snapshot(),
                seq: token.seq(),
            };
            (token, request)
        };

        let device = self.device.clone();
        let event_bus = self.event_bus.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            // The executor is trusted to honor the timeout, but not relied
            // on: a hung implementation is cut off here and the device
            // still returns to idle
            let result =
                match tokio::time::timeout(timeout, device.executor().run(&request, timeout)).await
                {
                    Ok(result) => result,
                    Err(_) => ExecutionResult::failed(ExecutionError::Timeout),
                };
            Self::finish(&device, &event_bus, token, request, result).await;
        });

        Ok(())
    }

    /// Commit an executor result and publish the outcome.
    async fn finish(
        device: &Arc<Device>,
        event_bus: &EventBus,
        token: ApplyToken,
        request: ExecutionRequest,
        result: ExecutionResult,
    ) {
        let outcome = {
            let mut inner = device.inner.lock().await;
            inner.state.commit(token, result)
        };

        let device_id = device.id().to_string();
        let metadata = EventMetadata::new(format!("device:{}", device_id))
            .with_correlation_id(request.seq.to_string());

        match outcome {
            CommitOutcome::Applied(value) => {
                info!(device_id = %device_id, value = %value, "value acknowledged");
                event_bus
                    .publish_with_metadata(
                        HubEvent::ValueChanged {
                            device_id,
                            value,
                            timestamp: chrono::Utc::now().timestamp_millis(),
                        },
                        metadata,
                    )
                    .await;
            }
            CommitOutcome::Failed(error) => {
                warn!(device_id = %device_id, error = %error, "apply failed");
                event_bus
                    .publish_with_metadata(
                        HubEvent::ActionFailed {
                            device_id,
                            error: error.to_string(),
                            timestamp: chrono::Utc::now().timestamp_millis(),
                        },
                        metadata,
                    )
                    .await;
            }
            CommitOutcome::Stale => {
                debug!(device_id = %device_id, seq = request.seq, "stale result discarded");
            }
        }
    }

    /// Last acknowledged value.
    pub async fn current_value(&self) -> Option<DeviceValue> {
        self.device.inner.lock().await.state.current_value().cloned()
    }

    /// Observable phase: `Applying` while a request is in flight.
    pub async fn phase(&self) -> SyncPhase {
        self.device.inner.lock().await.state.phase()
    }

    /// Update a configuration field.
    ///
    /// Validation errors surface synchronously; a successful update runs
    /// the field's change-callback before this returns and then emits a
    /// `ConfigChanged` event.
    pub async fn update_config(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), DeviceError> {
        {
            let mut inner = self.device.inner.lock().await;
            inner.config.set(field, value)?;
        }
        self.event_bus
            .publish_with_source(
                HubEvent::ConfigChanged {
                    device_id: self.device.id().to_string(),
                    field: field.to_string(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                },
                format!("device:{}", self.device.id()),
            )
            .await;
        Ok(())
    }

    /// Current value of one configuration field.
    pub async fn config_value(&self, field: &str) -> Option<FieldValue> {
        self.device.inner.lock().await.config.get(field)
    }

    /// Field descriptors for remote display.
    pub async fn describe_config(&self) -> Vec<FieldDescriptor> {
        self.device.inner.lock().await.config.describe()
    }

    /// Detach the device's state at unregistration.
    ///
    /// In-flight executor calls are allowed to finish; their commits become
    /// stale no-ops. Killing an already-spawned external process is the
    /// executor's best effort, not guaranteed here.
    pub async fn shutdown(&self) {
        self.device.inner.lock().await.state.detach();
    }
}
