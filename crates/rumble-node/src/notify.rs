//! Friendship notifications fanned out over a broadcast channel.

use rumble_social::{FriendshipEvent, Notifier};
use tokio::sync::broadcast;

/// [`Notifier`] that publishes events to every subscribed WebSocket.
///
/// Sending never blocks. Events sent while nobody listens are dropped, and a
/// slow subscriber skips ahead instead of holding up the sender.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<FriendshipEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FriendshipEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: FriendshipEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("no notification subscribers");
        }
    }
}
