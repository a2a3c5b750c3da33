//! Executor abstraction - the seam to the physical world.
//!
//! An [`Executor`] performs one external action (script, HTTP call,
//! hardware I/O) to push a target value onto a device and reports whether
//! it took. Executors are stateless per call: they receive a frozen
//! [`ExecutionRequest`] and return an [`ExecutionResult`], never touching
//! device state themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use devsync_core::DeviceValue;

use crate::config::ConfigSnapshot;
use crate::model::DeviceId;

pub mod script;

#[cfg(feature = "http")]
pub mod http;

/// Everything an executor needs for one apply attempt.
///
/// The config snapshot is frozen at request time, so field updates made
/// while the call is in flight never corrupt it. `seq` orders requests per
/// device; the state layer uses it to discard superseded results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub device_id: DeviceId,
    pub target: DeviceValue,
    pub config: ConfigSnapshot,
    pub seq: u64,
}

/// Why an apply attempt failed.
///
/// These are ordinary outcomes, not process-fatal errors: every variant
/// leaves the device idle with its acknowledged value intact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ExecutionError {
    /// The action did not complete within the configured timeout
    #[error("execution timed out")]
    Timeout,

    /// The external process exited with a non-zero status
    #[error("process exited with status {0}")]
    ExitCode(i32),

    /// The external process could not be started
    #[error("failed to spawn process: {0}")]
    Spawn(String),

    /// The remote endpoint was unreachable or answered outside 2xx
    #[error("transport error: {0}")]
    Transport(String),

    /// Anything else an executor implementation wants to report
    #[error("{0}")]
    Other(String),
}

/// Outcome of one apply attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the action took effect
    pub success: bool,
    /// Value the actuator reports having applied, if it adjusted the target
    pub reported_value: Option<DeviceValue>,
    /// Failure detail when `success` is false
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    /// Success, target applied as requested.
    pub fn ok() -> Self {
        Self {
            success: true,
            reported_value: None,
            error: None,
        }
    }

    /// Success, but the actuator applied an adjusted value.
    pub fn ok_with_value(value: DeviceValue) -> Self {
        Self {
            success: true,
            reported_value: Some(value),
            error: None,
        }
    }

    /// Failure with detail.
    pub fn failed(error: ExecutionError) -> Self {
        Self {
            success: false,
            reported_value: None,
            error: Some(error),
        }
    }
}

/// One synchronous external action: apply a value, report success/failure.
///
/// Implementations must not block the caller beyond `timeout`; on expiry
/// they return [`ExecutionError::Timeout`] and reclaim whatever resources
/// the mechanism allows (process kill is best effort).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, request: &ExecutionRequest, timeout: Duration) -> ExecutionResult;
}
