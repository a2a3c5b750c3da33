//! Core types for the DevSync value-synchronization platform.
//!
//! This crate defines the foundational abstractions shared across the
//! project: typed device values, the hub-facing event type with metadata,
//! and the broadcast event bus components use to emit them.

pub mod event;
pub mod eventbus;
pub mod value;

// Event exports
pub use event::{EventMetadata, HubEvent};

// Event bus exports
pub use eventbus::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventBusReceiver, FilterBuilder, FilteredReceiver,
    SharedEventBus,
};

// Value exports
pub use value::DeviceValue;
