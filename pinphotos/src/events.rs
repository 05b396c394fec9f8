//! Event bus for collection changes
//!
//! Views subscribe here instead of observing the database.

use crate::config::EVENT_BUS_CAPACITY;
use serde::Serialize;
use tokio::sync::broadcast;

/// Collection change events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A photo's image is now in the blob store
    PhotoLoaded { pin_id: String, photo_id: String },

    /// A sync finished reconciling a pin's records
    CollectionSynced {
        pin_id: String,
        photo_count: usize,
        total_photos: i64,
    },

    PhotoRemoved { pin_id: String, photo_id: String },

    PinRemoved { pin_id: String },

    PinRenamed { pin_id: String, name: String },
}

/// Event bus for broadcasting events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: Event) {
        tracing::debug!("Emitting event: {:?}", event);
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}
