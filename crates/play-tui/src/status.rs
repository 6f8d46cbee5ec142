//! StatusUpdateChannel — process-wide fan-out of pushed `StatusUpdate`s.
//!
//! The push listener publishes; the UI holds a `Subscription` for as long as
//! it lives.  Snapshots are full state, so a subscriber that falls behind
//! just skips ahead to the newest one.  Each snapshot carries the
//! credentials generation the listener was opened under.

use play_proto::protocol::StatusUpdate;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct PushedUpdate {
    pub generation: u64,
    pub update: StatusUpdate,
}

#[derive(Clone)]
pub struct StatusUpdateChannel {
    tx: broadcast::Sender<PushedUpdate>,
}

impl StatusUpdateChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget.  Returns how many subscribers the snapshot reached.
    pub fn publish(&self, update: PushedUpdate) -> usize {
        match self.tx.send(update) {
            Ok(n) => n,
            Err(_) => {
                debug!("status: no subscribers, update dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StatusUpdateChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription.  Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<PushedUpdate>,
}

impl Subscription {
    /// Next snapshot, or `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<PushedUpdate> {
        loop {
            match self.rx.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("status: subscriber lagged by {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use play_proto::protocol::Song;

    fn update(name: &str) -> PushedUpdate {
        PushedUpdate {
            generation: 1,
            update: StatusUpdate::new(
                Some(Song {
                    id: name.to_string(),
                    name: name.to_string(),
                    ..Song::default()
                }),
                Vec::new(),
            ),
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let channel = StatusUpdateChannel::new();
        assert_eq!(channel.publish(update("a")), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_update() {
        let channel = StatusUpdateChannel::new();
        let mut sub = channel.subscribe();
        assert_eq!(channel.publish(update("Hey Jude")), 1);
        let got = sub.recv().await.unwrap();
        assert_eq!(got.generation, 1);
        assert_eq!(got.update.playing.unwrap().name, "Hey Jude");
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let channel = StatusUpdateChannel::new();
        let sub = channel.subscribe();
        let other = channel.subscribe();
        assert_eq!(channel.publish(update("a")), 2);
        drop(sub);
        assert_eq!(channel.publish(update("b")), 1);
        drop(other);
        assert_eq!(channel.publish(update("c")), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let channel = StatusUpdateChannel::with_capacity(1);
        let mut sub = channel.subscribe();
        channel.publish(update("one"));
        channel.publish(update("two"));
        channel.publish(update("three"));
        let got = sub.recv().await.unwrap();
        assert_eq!(got.update.playing.unwrap().name, "three");
    }

    #[tokio::test]
    async fn recv_ends_when_channel_dropped() {
        let channel = StatusUpdateChannel::new();
        let mut sub = channel.subscribe();
        drop(channel);
        assert!(sub.recv().await.is_none());
    }
}
