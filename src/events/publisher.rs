use super::types::{LifecycleEvent, LifecyclePhase};
use crate::logging;
use tokio::sync::broadcast;

/// Publisher for component lifecycle events.
///
/// Every event is mirrored into the tracing pipeline and broadcast to any
/// subscribers. Publishing never fails: an observer that is absent or lagging
/// must not affect the deployment itself.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        match event.phase {
            LifecyclePhase::Failure => logging::log_error(
                &event.component,
                "lifecycle",
                &event.message,
                None,
            ),
            _ => logging::log_component_event(
                &event.component,
                &event.phase.to_string(),
                &event.message,
            ),
        }

        // No subscribers is fine for lifecycle events
        let _ = self.sender.send(event);
    }

    pub fn start(&self, component: &str, message: impl Into<String>) {
        self.publish(LifecycleEvent::new(component, LifecyclePhase::Start, message));
    }

    pub fn success(&self, component: &str, message: impl Into<String>) {
        self.publish(LifecycleEvent::new(component, LifecyclePhase::Success, message));
    }

    pub fn failure(&self, component: &str, message: impl Into<String>) {
        self.publish(LifecycleEvent::new(component, LifecyclePhase::Failure, message));
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}
