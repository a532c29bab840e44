use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{db::Message, error::SubscriptionError};

use super::{RealtimeFeed, Subscription};

/// In-process change feed for message inserts. Every subscriber sees every
/// insert; subscriptions filter by room on their side.
#[derive(Clone)]
pub struct BroadcastFeed {
    tx: broadcast::Sender<Message>,
    active: Arc<AtomicUsize>,
}

impl BroadcastFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn publish(&self, message: Message) {
        // no receivers is fine, nobody is looking at that room
        let _ = self.tx.send(message);
    }

    /// Number of subscriptions currently held across all chat windows.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl RealtimeFeed for BroadcastFeed {
    type Subscription = BroadcastSubscription;

    fn subscribe(&self, room_id: Uuid) -> BroadcastSubscription {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%room_id, active, "subscribed to message inserts");

        BroadcastSubscription {
            room_id,
            rx: Some(self.tx.subscribe()),
            active: self.active.clone(),
        }
    }
}

pub struct BroadcastSubscription {
    room_id: Uuid,
    rx: Option<broadcast::Receiver<Message>>,
    active: Arc<AtomicUsize>,
}

impl Subscription for BroadcastSubscription {
    fn room_id(&self) -> Uuid {
        self.room_id
    }

    async fn recv(&mut self) -> Result<Message, SubscriptionError> {
        loop {
            let Some(rx) = self.rx.as_mut() else {
                return Err(SubscriptionError::Closed);
            };
            match rx.recv().await {
                Ok(message) if message.room_id == self.room_id => return Ok(message),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    let err = SubscriptionError::Lagged(skipped);
                    tracing::warn!(room_id = %self.room_id, "{err}");
                    return Err(err);
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(room_id = %self.room_id, "{}", SubscriptionError::Closed);
                    self.rx = None;
                    return Err(SubscriptionError::Closed);
                }
            }
        }
    }
}

impl Drop for BroadcastSubscription {
    fn drop(&mut self) {
        let active = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(room_id = %self.room_id, active, "unsubscribed from message inserts");
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn message(room_id: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_id,
            sender_id: Uuid::now_v7(),
            content: content.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn delivers_only_the_subscribed_room() {
        let feed = BroadcastFeed::new(16);
        let room_a = Uuid::now_v7();
        let room_b = Uuid::now_v7();

        let mut sub = feed.subscribe(room_a);
        feed.publish(message(room_b, "elsewhere"));
        feed.publish(message(room_a, "here"));

        let got = sub.recv().await.unwrap();
        assert_eq!(got.content, "here");
        assert_eq!(got.room_id, room_a);
    }

    #[tokio::test]
    async fn dropping_a_subscription_releases_it() {
        let feed = BroadcastFeed::new(16);
        let room = Uuid::now_v7();

        let first = feed.subscribe(room);
        let second = feed.subscribe(room);
        assert_eq!(feed.active_subscriptions(), 2);

        first.unsubscribe();
        assert_eq!(feed.active_subscriptions(), 1);
        drop(second);
        assert_eq!(feed.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn closed_feed_ends_the_subscription() {
        let feed = BroadcastFeed::new(16);
        let room = Uuid::now_v7();
        let mut sub = feed.subscribe(room);
        drop(feed);

        assert!(matches!(sub.recv().await, Err(SubscriptionError::Closed)));
        assert!(matches!(sub.recv().await, Err(SubscriptionError::Closed)));
    }

    #[tokio::test]
    async fn falling_behind_is_reported_then_delivery_resumes() {
        let feed = BroadcastFeed::new(2);
        let room = Uuid::now_v7();
        let mut sub = feed.subscribe(room);

        for i in 0..5 {
            feed.publish(message(room, &i.to_string()));
        }

        assert!(matches!(sub.recv().await, Err(SubscriptionError::Lagged(3))));
        assert_eq!(sub.recv().await.unwrap().content, "3");
        assert_eq!(sub.recv().await.unwrap().content, "4");
    }
}
