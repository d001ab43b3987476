use crate::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub topic: String,
    pub sequence: u64,
}

/// Best-effort publish/subscribe for "shared data changed" notifications.
/// There is no replay: a subscriber only sees events published after it subscribed.
pub trait ChangeBus: Send + Sync {
    fn publish(&self, topic: &str) -> AppResult<()>;
    fn subscribe(&self, topic: &str) -> AppResult<ChangeSubscription>;
}

pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn new(receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next notification, skipping past any that were dropped
    /// while lagging. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change subscriber lagged; coalescing");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Discards every notification already queued and returns how many.
    pub fn drain_pending(&mut self) -> usize {
        let mut drained = 0;
        while self.try_recv().is_some() {
            drained += 1;
        }
        drained
    }
}

/// In-process bus shared by every window of one process.
#[derive(Clone, Default)]
pub struct LocalChangeBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>>,
    sequence: Arc<AtomicU64>,
}

impl LocalChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> AppResult<broadcast::Sender<ChangeEvent>> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| AppError::Bus("change bus mutex poisoned".to_string()))?;
        Ok(channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone())
    }
}

impl ChangeBus for LocalChangeBus {
    fn publish(&self, topic: &str) -> AppResult<()> {
        let sender = self.sender(topic)?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        // No receivers is not a failure; nobody needed the notification.
        let delivered = sender
            .send(ChangeEvent {
                topic: topic.to_string(),
                sequence,
            })
            .unwrap_or(0);
        tracing::debug!(topic, sequence, delivered, "published change notification");
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> AppResult<ChangeSubscription> {
        Ok(ChangeSubscription::new(self.sender(topic)?.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeBus, LocalChangeBus};

    #[tokio::test]
    async fn subscribers_receive_events_for_their_topic() {
        let bus = LocalChangeBus::new();
        let mut first = bus.subscribe("data").expect("subscribe");
        let mut second = bus.subscribe("data").expect("subscribe");
        let mut other = bus.subscribe("other").expect("subscribe");

        bus.publish("data").expect("publish");

        assert_eq!(first.recv().await.map(|event| event.topic), Some("data".to_string()));
        assert!(second.recv().await.is_some());
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn publish_without_subscribers_succeeds() {
        let bus = LocalChangeBus::new();
        assert!(bus.publish("data").is_ok());
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let bus = LocalChangeBus::new();
        bus.publish("data").expect("publish");
        let mut late = bus.subscribe("data").expect("subscribe");
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_coalesces() {
        let bus = LocalChangeBus::new();
        let mut slow = bus.subscribe("data").expect("subscribe");
        for _ in 0..200 {
            bus.publish("data").expect("publish");
        }
        let event = slow.recv().await.expect("event");
        assert!(event.sequence > 1);
        assert!(slow.drain_pending() > 0);
        assert!(slow.try_recv().is_none());
    }

    #[tokio::test]
    async fn drain_pending_counts_queued_events() {
        let bus = LocalChangeBus::new();
        let mut subscriber = bus.subscribe("data").expect("subscribe");
        for _ in 0..3 {
            bus.publish("data").expect("publish");
        }
        assert!(subscriber.recv().await.is_some());
        assert_eq!(subscriber.drain_pending(), 2);
        assert_eq!(subscriber.drain_pending(), 0);
    }
}
