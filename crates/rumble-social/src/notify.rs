//! Friendship notifications.

use crate::edge::{EdgeId, UserId};
use serde::Serialize;

/// User-facing events emitted by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FriendshipEvent {
    RequestSent {
        edge_id: EdgeId,
        from: UserId,
        to: UserId,
    },
    RequestAccepted {
        edge_id: EdgeId,
        /// The requester, who gets told about it.
        requester: UserId,
        by: UserId,
    },
    RequestDeclined {
        edge_id: EdgeId,
        requester: UserId,
        by: UserId,
    },
    Blocked {
        by: UserId,
        target: UserId,
    },
    Removed {
        by: UserId,
        other: UserId,
    },
}

impl FriendshipEvent {
    /// Whether `user` is one of the parties this event is about.
    pub fn concerns(&self, user: &str) -> bool {
        match self {
            FriendshipEvent::RequestSent { from, to, .. } => from == user || to == user,
            FriendshipEvent::RequestAccepted { requester, by, .. }
            | FriendshipEvent::RequestDeclined { requester, by, .. } => {
                requester == user || by == user
            }
            FriendshipEvent::Blocked { by, target } => by == user || target == user,
            FriendshipEvent::Removed { by, other } => by == user || other == user,
        }
    }
}

/// Receiver of friendship events. Delivery is best effort; implementations
/// must not block the caller.
pub trait Notifier {
    fn notify(&self, event: FriendshipEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: FriendshipEvent) {}
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, event: FriendshipEvent) {
        (**self).notify(event)
    }
}
