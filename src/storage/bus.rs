//! Process-wide storage change notifications

use tokio::sync::broadcast;
use uuid::Uuid;

/// Events kept for receivers that have not caught up yet. A receiver that
/// falls further behind resynchronizes from the store.
const BUS_CAPACITY: usize = 256;

/// Who produced a storage change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A `PersistedValue` in this process
    Instance(Uuid),
    /// Another process, observed on disk
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// Serialized new value; `None` when the key was removed
    pub value: Option<String>,
    pub origin: ChangeOrigin,
}

/// Broadcast channel shared by every consumer of one store
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<StorageEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: StorageEvent) {
        tracing::trace!("Storage change on '{}' from {:?}", event.key, event.origin);
        // Err only means nobody is listening right now
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
