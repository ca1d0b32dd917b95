//! Live subscriber registry for one grid actor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::protocol::{OutgoingFrame, ServerMessage};

/// Unique subscriber identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(format!("sub:{}", Uuid::new_v4()))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-local metadata attached to a connection.
///
/// Starts empty; reserved for resume information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberAttachment {
    pub connected_at: DateTime<Utc>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Default for SubscriberAttachment {
    fn default() -> Self {
        Self {
            connected_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// A registered connection
#[derive(Debug)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub attachment: SubscriberAttachment,

    /// Outbound queue drained by the connection's writer task
    tx: mpsc::Sender<OutgoingFrame>,
}

impl Subscriber {
    pub fn new(tx: mpsc::Sender<OutgoingFrame>) -> Self {
        Self {
            id: SubscriberId::new(),
            attachment: SubscriberAttachment::default(),
            tx,
        }
    }

    pub fn with_attachment(mut self, attachment: SubscriberAttachment) -> Self {
        self.attachment = attachment;
        self
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, frame: OutgoingFrame) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Lagging(self.id.to_string()),
            TrySendError::Closed(_) => DeliveryError::Closed(self.id.to_string()),
        })
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
    pub removed: usize,
}

/// Subscriber set owned by a single actor
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Subscriber) -> SubscriberId {
        let id = subscriber.id.clone();
        self.subscribers.insert(id.clone(), subscriber);
        tracing::info!("Subscriber registered: {}", id);
        id
    }

    pub fn unregister(&mut self, id: &SubscriberId) -> bool {
        let removed = self.subscribers.remove(id).is_some();
        if removed {
            tracing::info!("Subscriber unregistered: {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn get(&self, id: &SubscriberId) -> Option<&Subscriber> {
        self.subscribers.get(id)
    }

    /// Send a message to one subscriber
    pub fn send_to(&mut self, id: &SubscriberId, message: &ServerMessage) -> Result<(), DeliveryError> {
        let Some(frame) = encode(message) else {
            return Ok(());
        };
        let result = match self.subscribers.get(id) {
            Some(subscriber) => subscriber.try_send(frame),
            None => Err(DeliveryError::Closed(id.to_string())),
        };
        if result.is_err() {
            self.unregister(id);
        }
        result
    }

    /// Push a message to every subscriber.
    ///
    /// Failures are logged and swallowed. A subscriber that misses a frame,
    /// whether closed or lagging, is removed: dropping its sender ends the
    /// connection, and the client recovers with a fresh snapshot on
    /// reconnect.
    pub fn broadcast(&mut self, message: &ServerMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let Some(frame) = encode(message) else {
            return report;
        };
        let mut failed = Vec::new();

        for (id, subscriber) in &self.subscribers {
            match subscriber.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e @ DeliveryError::Lagging(_)) => {
                    tracing::warn!("{}, disconnecting", e);
                    report.dropped += 1;
                    failed.push(id.clone());
                }
                Err(e @ DeliveryError::Closed(_)) => {
                    tracing::debug!("{}", e);
                    report.dropped += 1;
                    failed.push(id.clone());
                }
            }
        }

        for id in failed {
            if self.unregister(&id) {
                report.removed += 1;
            }
        }

        report
    }
}

fn encode(message: &ServerMessage) -> Option<OutgoingFrame> {
    match message.to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!("Failed to encode server message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_id_generation() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        assert_ne!(id1, id2);
        assert!(id1.0.starts_with("sub:"));
    }

    #[test]
    fn test_register_unregister() {
        let mut registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::channel(10);
        let id = registry.register(Subscriber::new(tx));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id).unwrap().attachment.metadata.is_empty());

        assert!(registry.unregister(&id));
        assert!(!registry.unregister(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_all() {
        let mut registry = SubscriberRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, mut rx2) = mpsc::channel(10);
        registry.register(Subscriber::new(tx1));
        registry.register(Subscriber::new(tx2));

        let report = registry.broadcast(&ServerMessage::Clear);
        assert_eq!(report.delivered, 2);
        assert_eq!(rx1.try_recv().unwrap(), r#"{"type":"clear"}"#);
        assert_eq!(rx2.try_recv().unwrap(), r#"{"type":"clear"}"#);
    }

    #[test]
    fn test_closed_subscriber_does_not_block_healthy_one() {
        let mut registry = SubscriberRegistry::new();
        let (dead_tx, dead_rx) = mpsc::channel(10);
        let (live_tx, mut live_rx) = mpsc::channel(10);
        let dead = registry.register(Subscriber::new(dead_tx));
        registry.register(Subscriber::new(live_tx));
        drop(dead_rx);

        let msg = ServerMessage::Cell {
            x: 1,
            y: 1,
            value: "v".to_string(),
        };
        let report = registry.broadcast(&msg);

        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, 1);
        assert!(registry.get(&dead).is_none());
        assert_eq!(
            live_rx.try_recv().unwrap(),
            r#"{"type":"cell","x":1,"y":1,"value":"v"}"#
        );
    }

    #[test]
    fn test_lagging_subscriber_is_removed() {
        let mut registry = SubscriberRegistry::new();
        let (lagging_tx, mut lagging_rx) = mpsc::channel(1);
        let (live_tx, mut live_rx) = mpsc::channel(10);
        let lagging = registry.register(Subscriber::new(lagging_tx));
        registry.register(Subscriber::new(live_tx));

        assert_eq!(registry.broadcast(&ServerMessage::Clear).delivered, 2);
        let report = registry.broadcast(&ServerMessage::Clear);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.removed, 1);
        assert!(registry.get(&lagging).is_none());
        assert_eq!(registry.len(), 1);

        // The queued frame is still readable, then the channel reports closed.
        assert!(lagging_rx.try_recv().is_ok());
        assert!(matches!(
            lagging_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        assert!(live_rx.try_recv().is_ok());
        assert!(live_rx.try_recv().is_ok());
    }

    #[test]
    fn test_send_to_unknown_subscriber() {
        let mut registry = SubscriberRegistry::new();
        let err = registry
            .send_to(&SubscriberId::new(), &ServerMessage::Clear)
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Closed(_)));
    }
}
