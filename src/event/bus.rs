use tokio::sync::broadcast;
use tracing::debug;

use super::events::RecordEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast channel distributing record events to all subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RecordEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Emits an event to every current subscriber. Events emitted while no
    /// subscriber exists are dropped.
    pub fn emit(&self, event: RecordEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Record event emitted");
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    event_type = event.event_type(),
                    "Record event emitted with no receivers"
                );
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
