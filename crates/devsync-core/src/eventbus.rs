//! Event bus for the synchronization core.
//!
//! All outbound notifications flow through here: components publish
//! [`HubEvent`]s and hosts subscribe, optionally filtered. A slow or absent
//! subscriber never blocks a publisher.

use crate::event::{EventMetadata, HubEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Shared handle to an event bus.
pub type SharedEventBus = Arc<EventBus>;

/// Broadcast-based event bus.
///
/// Supports publishing with automatic metadata generation, plain
/// subscriptions, and filtered subscriptions for specific event kinds.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(HubEvent, EventMetadata)>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    ///
    /// The capacity determines how many events are buffered for slow
    /// subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event with default metadata.
    ///
    /// If there are no subscribers the event is discarded. Returns `true`
    /// if there was at least one subscriber.
    pub async fn publish(&self, event: HubEvent) -> bool {
        self.publish_with_source(event, "core").await
    }

    /// Publish an event with a custom source.
    pub async fn publish_with_source(&self, event: HubEvent, source: impl Into<String>) -> bool {
        let metadata = EventMetadata::new(source);
        self.publish_with_metadata(event, metadata).await
    }

    /// Publish an event with custom metadata.
    pub async fn publish_with_metadata(&self, event: HubEvent, metadata: EventMetadata) -> bool {
        self.tx.send((event, metadata)).is_ok()
    }

    /// Subscribe to all events.
    ///
    /// If the subscriber falls behind, older events may be dropped.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Only events for which the filter returns `true` are delivered.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&HubEvent) -> bool + Send + 'static,
    {
        FilteredReceiver {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    /// Filtered subscription helpers for common patterns.
    pub fn filter(&self) -> FilterBuilder {
        FilterBuilder {
            tx: self.tx.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for all events from the event bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(HubEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the event bus is closed.
    pub async fn recv(&mut self) -> Option<(HubEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                // Missed some events, keep receiving from where we are
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<(HubEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver for filtered events from the event bus.
pub struct FilteredReceiver<F>
where
    F: Fn(&HubEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(HubEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&HubEvent) -> bool + Send,
{
    /// Receive the next event matching the filter.
    ///
    /// Returns `None` if the event bus is closed.
    pub async fn recv(&mut self) -> Option<(HubEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some((event, meta));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive a matching event without blocking.
    pub fn try_recv(&mut self) -> Option<(HubEvent, EventMetadata)> {
        while let Ok((event, meta)) = self.rx.try_recv() {
            if (self.filter)(&event) {
                return Some((event, meta));
            }
        }
        None
    }
}

/// Builder for common filtered subscriptions.
pub struct FilterBuilder {
    tx: broadcast::Sender<(HubEvent, EventMetadata)>,
}

impl FilterBuilder {
    /// Subscribe to sync-cycle outcomes (`ValueChanged`, `ActionFailed`).
    pub fn sync_events(&self) -> FilteredReceiver<fn(&HubEvent) -> bool> {
        FilteredReceiver {
            rx: self.tx.subscribe(),
            filter: HubEvent::is_sync_event,
        }
    }

    /// Subscribe to registration/unregistration events.
    pub fn lifecycle_events(&self) -> FilteredReceiver<fn(&HubEvent) -> bool> {
        FilteredReceiver {
            rx: self.tx.subscribe(),
            filter: HubEvent::is_lifecycle_event,
        }
    }

    /// Subscribe to every event concerning one device.
    pub fn device(
        &self,
        device_id: impl Into<String>,
    ) -> FilteredReceiver<impl Fn(&HubEvent) -> bool + Send> {
        let device_id = device_id.into();
        FilteredReceiver {
            rx: self.tx.subscribe(),
            filter: move |event: &HubEvent| event.device_id() == device_id,
        }
    }
}
