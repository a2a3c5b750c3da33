//! Device model - identity and error types.
//!
//! A device is a managed unit exposing configurable state synchronized with
//! a physical or simulated actuator. This module defines how devices are
//! identified and the errors their operations can surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FieldType;

/// Unique identifier for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a device presents itself to the hub.
///
/// `device_type` is the machine-readable kind (e.g. `"light-sensor"`),
/// `name` the human-readable kind name, and `label` names the physical part
/// actually wired up (e.g. `"BH1750"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Device type identifier
    pub device_type: String,
    /// Human-readable device type name
    pub name: String,
    /// Name of the physical sensor/actuator, if known
    pub label: Option<String>,
}

impl DeviceIdentity {
    pub fn new(device_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            name: name.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Errors that can occur during device operations.
///
/// Execution failures (timeouts, non-zero exits) are deliberately not here:
/// they are ordinary [`ExecutionResult`](crate::executor::ExecutionResult)
/// outcomes surfaced through `ActionFailed` events, never errors thrown at
/// the host.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Device not found
    #[error("Device not found: {0}")]
    NotFound(DeviceId),

    /// Already exists error
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Configuration field was never declared
    #[error("Unknown configuration field: {0}")]
    UnknownField(String),

    /// Value does not match the field's declared type
    #[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: FieldType,
    },

    /// A request is already in flight (strict single-flight policy)
    #[error("Device busy: {0}")]
    Busy(DeviceId),

    /// Device was unregistered while the operation was underway
    #[error("Device detached: {0}")]
    Detached(DeviceId),
}
