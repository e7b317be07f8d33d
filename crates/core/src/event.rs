//! Dialog event system: observe what sessions do without coupling to them.
//!
//! Events are published when a flow starts or ends and when a session
//! produces an artifact. Hosts subscribe to install programs, pair devices,
//! or log conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All dialog events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DialogEvent {
    /// A flow was pushed onto a session's stack
    FlowPushed {
        session_id: String,
        flow: String,
        depth: usize,
        timestamp: DateTime<Utc>,
    },

    /// A flow finished and handed its result to its parent
    FlowCompleted {
        session_id: String,
        flow: String,
        timestamp: DateTime<Utc>,
    },

    /// The stack was unwound back to the default flow
    FlowAborted {
        session_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A validated program is ready to install
    ProgramGenerated {
        session_id: String,
        app_id: String,
        name: String,
        code: String,
        timestamp: DateTime<Utc>,
    },

    /// The user picked a discovered device to set up
    DeviceSelected {
        session_id: String,
        device_id: String,
        kind: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for dialog events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DialogEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DialogEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DialogEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DialogEvent::ProgramGenerated {
            session_id: "s-0".into(),
            app_id: "app-0".into(),
            name: "RulecraftImmediateTwitter".into(),
            code: "...".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DialogEvent::ProgramGenerated { name, app_id, .. } => {
                assert_eq!(name, "RulecraftImmediateTwitter");
                assert_eq!(app_id, "app-0");
            }
            _ => panic!("Expected ProgramGenerated event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DialogEvent::FlowAborted {
            session_id: "s-0".into(),
            reason: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
