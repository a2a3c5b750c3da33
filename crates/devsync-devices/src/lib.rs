//! Device-value synchronization core.
//!
//! This crate applies externally-requested state changes to physical or
//! simulated devices through pluggable executors, tracks acknowledged
//! state, and exposes typed configuration that can change at runtime.
//!
//! ## Architecture
//!
//! - **DeviceState**: last acknowledged value, in-flight apply, stale-token
//!   discard rule
//! - **ConfigurationRegistry**: named, typed, runtime-adjustable fields with
//!   synchronous change-callbacks
//! - **Executor**: one external action (script, HTTP, hardware I/O) with a
//!   mandatory timeout
//! - **SyncController**: per-device request serialization, executor
//!   dispatch, commit, event emission
//! - **DeviceService**: host-facing registration and routing
//!
//! Devices run in parallel; requests within one device are serialized (or
//! superseded, per [`ApplyPolicy`]). Nothing in this crate is fatal to the
//! process: every failure path leaves a device idle with its acknowledged
//! value intact.

pub mod builtin;
pub mod config;
pub mod controller;
pub mod device;
pub mod executor;
pub mod model;
pub mod service;
pub mod state;

// Re-exports for convenience
pub use builtin::{BuiltinKind, BUILTIN_KINDS};
pub use config::{
    ChangeCallback, ConfigSnapshot, ConfigurationRegistry, FieldDescriptor, FieldType, FieldValue,
};
pub use controller::{ApplyPolicy, SyncController, DEFAULT_EXECUTOR_TIMEOUT};
pub use device::Device;
pub use executor::script::ScriptExecutor;
pub use executor::{ExecutionError, ExecutionRequest, ExecutionResult, Executor};
pub use model::{DeviceError, DeviceId, DeviceIdentity};
pub use service::{DeviceHandle, DeviceInfo, DeviceService};
pub use state::{ApplyToken, CommitOutcome, DeviceState, SyncPhase};

#[cfg(feature = "http")]
pub use executor::http::HttpExecutor;

// Re-export the core value and event types alongside the device API
pub use devsync_core::{DeviceValue, EventBus, HubEvent};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
