//! Device service - the host-facing surface.
//!
//! The hub registers and unregisters devices here and routes desired-value
//! and configuration updates through the returned handles. Devices are
//! created at registration and destroyed at unregistration; both are
//! explicit lifecycle calls, and each emits the matching lifecycle event.
//!
//! Devices run independently: requests for different devices proceed in
//! parallel, and a failure on one device is never visible to another
//! except as its own events.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use devsync_core::{DeviceValue, EventBus, HubEvent};

use crate::config::{ConfigurationRegistry, FieldDescriptor, FieldValue};
use crate::controller::{ApplyPolicy, SyncController, DEFAULT_EXECUTOR_TIMEOUT};
use crate::device::Device;
use crate::executor::Executor;
use crate::model::{DeviceError, DeviceId, DeviceIdentity};
use crate::state::SyncPhase;

/// Opaque reference to a registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    id: DeviceId,
}

impl DeviceHandle {
    pub fn id(&self) -> DeviceId {
        self.id
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Summary of one registered device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub handle: DeviceHandle,
    pub identity: DeviceIdentity,
    pub phase: SyncPhase,
    pub current_value: Option<DeviceValue>,
}

/// Host-facing registry of running devices.
pub struct DeviceService {
    devices: DashMap<DeviceId, Arc<SyncController>>,
    event_bus: EventBus,
    timeout: Duration,
    policy: ApplyPolicy,
}

impl DeviceService {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            devices: DashMap::new(),
            event_bus,
            timeout: DEFAULT_EXECUTOR_TIMEOUT,
            policy: ApplyPolicy::default(),
        }
    }

    /// Bound on each executor invocation for devices registered afterwards.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Concurrency policy for devices registered afterwards.
    pub fn with_policy(mut self, policy: ApplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Register a device and start accepting value requests for it.
    pub async fn register_device(
        &self,
        identity: DeviceIdentity,
        config: ConfigurationRegistry,
        executor: Arc<dyn Executor>,
    ) -> DeviceHandle {
        let device = Arc::new(Device::new(identity, config, executor));
        let device_id = device.id();
        let controller = SyncController::new(device, self.event_bus.clone())
            .with_timeout(self.timeout)
            .with_policy(self.policy);

        let device_type = controller.device().identity().device_type.clone();
        self.devices.insert(device_id, Arc::new(controller));

        info!(device_id = %device_id, device_type = %device_type, "device registered");
        self.event_bus
            .publish(HubEvent::DeviceRegistered {
                device_id: device_id.to_string(),
                device_type,
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await;

        DeviceHandle { id: device_id }
    }

    /// Unregister a device.
    ///
    /// Any in-flight executor call finishes on its own but its result is
    /// discarded; the device's acknowledged value is gone with it.
    pub async fn unregister_device(&self, handle: &DeviceHandle) -> Result<(), DeviceError> {
        let (_, controller) = self
            .devices
            .remove(&handle.id)
            .ok_or(DeviceError::NotFound(handle.id))?;
        controller.shutdown().await;

        info!(device_id = %handle.id, "device unregistered");
        self.event_bus
            .publish(HubEvent::DeviceUnregistered {
                device_id: handle.id.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await;
        Ok(())
    }

    /// Request that a device take on a target value.
    pub async fn request_value(
        &self,
        handle: &DeviceHandle,
        value: impl Into<DeviceValue>,
    ) -> Result<(), DeviceError> {
        self.controller(handle)?.request_value(value.into()).await
    }

    /// Update one configuration field on a device.
    pub async fn update_config(
        &self,
        handle: &DeviceHandle,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), DeviceError> {
        self.controller(handle)?.update_config(field, value).await
    }

    /// Last acknowledged value of a device.
    pub async fn current_value(
        &self,
        handle: &DeviceHandle,
    ) -> Result<Option<DeviceValue>, DeviceError> {
        Ok(self.controller(handle)?.current_value().await)
    }

    /// Configuration descriptors of a device, for remote display.
    pub async fn describe_config(
        &self,
        handle: &DeviceHandle,
    ) -> Result<Vec<FieldDescriptor>, DeviceError> {
        Ok(self.controller(handle)?.describe_config().await)
    }

    /// Observable sync phase of a device.
    pub async fn phase(&self, handle: &DeviceHandle) -> Result<SyncPhase, DeviceError> {
        Ok(self.controller(handle)?.phase().await)
    }

    /// Summaries of all registered devices.
    pub async fn list_devices(&self) -> Vec<DeviceInfo> {
        let controllers: Vec<Arc<SyncController>> = self
            .devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut infos = Vec::with_capacity(controllers.len());
        for controller in controllers {
            infos.push(DeviceInfo {
                handle: DeviceHandle {
                    id: controller.device().id(),
                },
                identity: controller.device().identity().clone(),
                phase: controller.phase().await,
                current_value: controller.current_value().await,
            });
        }
        infos
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn controller(&self, handle: &DeviceHandle) -> Result<Arc<SyncController>, DeviceError> {
        self.devices
            .get(&handle.id)
            .map(|entry| entry.value().clone())
            .ok_or(DeviceError::NotFound(handle.id))
    }
}
