//! The device entity.
//!
//! A [`Device`] is composed of its capability modules - synchronization
//! state, configuration registry, executor - selected per device variant at
//! construction. It exclusively owns its state and configuration; the
//! executor only ever sees snapshots.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::ConfigurationRegistry;
use crate::executor::Executor;
use crate::model::{DeviceId, DeviceIdentity};
use crate::state::DeviceState;

/// State and configuration, guarded together.
///
/// One lock covers both so the config snapshot taken when a request is
/// issued is always consistent with the state transition that issued it.
pub(crate) struct DeviceInner {
    pub state: DeviceState,
    pub config: ConfigurationRegistry,
}

/// A managed device: identity plus its capability modules.
pub struct Device {
    id: DeviceId,
    identity: DeviceIdentity,
    executor: Arc<dyn Executor>,
    pub(crate) inner: Mutex<DeviceInner>,
}

impl Device {
    /// Create a device at registration time.
    pub fn new(
        identity: DeviceIdentity,
        config: ConfigurationRegistry,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            id: DeviceId::new(),
            identity,
            executor,
            inner: Mutex::new(DeviceInner {
                state: DeviceState::new(),
                config,
            }),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }
}
