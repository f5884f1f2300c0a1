use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::domain::event::FeedEvent;

/// Live subscription to post-mutation events. Dropping the receiver is
/// enough to stop delivery; `unsubscribe` removes the registration eagerly.
pub(crate) struct Subscription {
    pub(crate) id: u64,
    pub(crate) events: UnboundedReceiver<FeedEvent>,
}

/// Fans post-mutation events out to currently-connected subscribers.
/// Delivery is best-effort and at-most-once per subscriber per event: no
/// history, no replay, no durability.
pub(crate) struct NotificationHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, UnboundedSender<FeedEvent>>>,
}

impl NotificationHub {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers
            .lock()
            .expect("subscriber map mutex poisoned")
            .insert(id, tx);

        debug!(subscriber = id, "feed subscriber registered");
        Subscription { id, events: rx }
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .expect("subscriber map mutex poisoned")
            .remove(&id);
    }

    /// Delivers the event to every live subscriber and returns how many
    /// received it. A dead subscriber (dropped receiver) is pruned and never
    /// affects delivery to the rest.
    pub(crate) fn broadcast(&self, event: &FeedEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("subscriber map mutex poisoned");

        let mut dead = Vec::new();
        let mut delivered = 0;
        for (id, tx) in subscribers.iter() {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            subscribers.remove(&id);
        }

        debug!(delivered, "feed event broadcast");
        delivered
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber map mutex poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::error::TryRecvError;

    use super::NotificationHub;
    use crate::domain::event::FeedEvent;

    #[tokio::test]
    async fn broadcast_reaches_every_live_subscriber_exactly_once() {
        let hub = NotificationHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let delivered = hub.broadcast(&FeedEvent::Delete(1));
        assert_eq!(delivered, 2);

        assert!(matches!(first.events.try_recv(), Ok(FeedEvent::Delete(1))));
        assert!(matches!(
            first.events.try_recv(),
            Err(TryRecvError::Empty)
        ));
        assert!(matches!(second.events.try_recv(), Ok(FeedEvent::Delete(1))));
        assert!(matches!(
            second.events.try_recv(),
            Err(TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn late_subscriber_receives_nothing_retroactively() {
        let hub = NotificationHub::new();
        hub.broadcast(&FeedEvent::Delete(1));

        let mut late = hub.subscribe();
        assert!(matches!(late.events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn dead_subscriber_never_blocks_the_rest() {
        let hub = NotificationHub::new();
        let dead = hub.subscribe();
        let mut live = hub.subscribe();
        drop(dead.events);

        let delivered = hub.broadcast(&FeedEvent::Delete(9));
        assert_eq!(delivered, 1);
        assert!(matches!(live.events.try_recv(), Ok(FeedEvent::Delete(9))));

        // the dead channel is pruned on first failed send
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = NotificationHub::new();
        let mut subscription = hub.subscribe();

        hub.unsubscribe(subscription.id);
        hub.unsubscribe(subscription.id);
        assert_eq!(hub.subscriber_count(), 0);

        hub.broadcast(&FeedEvent::Delete(1));
        assert!(matches!(
            subscription.events.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
    }
}
