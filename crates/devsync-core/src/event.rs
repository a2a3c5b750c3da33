//! Events emitted by the synchronization core.
//!
//! The core never calls back into host code directly. Everything a host may
//! want to observe (acknowledged values, failed actions, device lifecycle)
//! is published as a [`HubEvent`] on the event bus.

use crate::value::DeviceValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier
    pub event_id: Uuid,
    /// When the event was published
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Component that published the event (e.g. "device:<id>")
    pub source: String,
    /// Correlates events belonging to one request
    pub correlation_id: Option<String>,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Events the synchronization core emits to the host.
///
/// `ValueChanged` and `ActionFailed` are the observable forms of the
/// momentary `Applied` and `Failed` states of a device's sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubEvent {
    /// A device was registered and is ready to accept value requests.
    DeviceRegistered {
        device_id: String,
        device_type: String,
        timestamp: i64,
    },
    /// A device was unregistered; in-flight results for it are discarded.
    DeviceUnregistered { device_id: String, timestamp: i64 },
    /// A requested value was confirmed applied to the physical device.
    ValueChanged {
        device_id: String,
        value: DeviceValue,
        timestamp: i64,
    },
    /// An apply attempt failed; the acknowledged value is unchanged.
    ActionFailed {
        device_id: String,
        error: String,
        timestamp: i64,
    },
    /// A configuration field was updated at runtime.
    ConfigChanged {
        device_id: String,
        field: String,
        timestamp: i64,
    },
}

impl HubEvent {
    /// Event type name, for logging and filtering.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::DeviceRegistered { .. } => "DeviceRegistered",
            Self::DeviceUnregistered { .. } => "DeviceUnregistered",
            Self::ValueChanged { .. } => "ValueChanged",
            Self::ActionFailed { .. } => "ActionFailed",
            Self::ConfigChanged { .. } => "ConfigChanged",
        }
    }

    /// Device the event concerns.
    pub fn device_id(&self) -> &str {
        match self {
            Self::DeviceRegistered { device_id, .. }
            | Self::DeviceUnregistered { device_id, .. }
            | Self::ValueChanged { device_id, .. }
            | Self::ActionFailed { device_id, .. }
            | Self::ConfigChanged { device_id, .. } => device_id,
        }
    }

    /// True for events produced by a sync cycle (apply outcome).
    pub fn is_sync_event(&self) -> bool {
        matches!(self, Self::ValueChanged { .. } | Self::ActionFailed { .. })
    }

    /// True for registration/unregistration events.
    pub fn is_lifecycle_event(&self) -> bool {
        matches!(
            self,
            Self::DeviceRegistered { .. } | Self::DeviceUnregistered { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        let changed = HubEvent::ValueChanged {
            device_id: "d1".to_string(),
            value: DeviceValue::Integer(5),
            timestamp: 0,
        };
        assert!(changed.is_sync_event());
        assert!(!changed.is_lifecycle_event());
        assert_eq!(changed.type_name(), "ValueChanged");
        assert_eq!(changed.device_id(), "d1");

        let registered = HubEvent::DeviceRegistered {
            device_id: "d1".to_string(),
            device_type: "light-dimmer".to_string(),
            timestamp: 0,
        };
        assert!(registered.is_lifecycle_event());
    }

    #[test]
    fn test_metadata_correlation() {
        let meta = EventMetadata::new("device:d1").with_correlation_id("req-7");
        assert_eq!(meta.source, "device:d1");
        assert_eq!(meta.correlation_id.as_deref(), Some("req-7"));
    }
}
