//! The friendship state machine.

use crate::edge::{Edge, EdgeStatus, PairKey, UserId};
use crate::error::{Error, Result};
use crate::notify::{FriendshipEvent, NoopNotifier, Notifier};
use crate::store::{EdgeStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Accept,
    Decline,
}

/// What declining a request does to the pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclinePolicy {
    /// Delete the edge: either party may ask again later.
    #[default]
    Release,
    /// Move the edge to `Blocked` until someone removes it.
    Block,
}

/// A user's relationships, split the way the social page shows them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FriendshipView {
    /// Other party of every accepted edge.
    pub friends: Vec<UserId>,
    /// Pending requests this user sent.
    pub sent: Vec<Edge>,
    /// Pending requests waiting on this user.
    pub received: Vec<Edge>,
}

/// Friendship rules over an [`EdgeStore`].
///
/// Stateless apart from its collaborators: all state lives in the store.
pub struct Friendships<S, N = NoopNotifier> {
    store: S,
    notifier: N,
    decline_policy: DeclinePolicy,
}

impl<S: EdgeStore> Friendships<S> {
    /// State machine with notifications switched off.
    pub fn without_notifications(store: S) -> Self {
        Friendships::new(store, NoopNotifier)
    }
}

impl<S: EdgeStore, N: Notifier> Friendships<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            decline_policy: DeclinePolicy::default(),
        }
    }

    pub fn with_decline_policy(mut self, policy: DeclinePolicy) -> Self {
        self.decline_policy = policy;
        self
    }

    pub fn decline_policy(&self) -> DeclinePolicy {
        self.decline_policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `requester` asks `target` to be friends.
    pub fn send_request(&self, requester: &str, target: &str) -> Result<Edge> {
        let pair = PairKey::new(requester, target);
        if pair.is_self_pair() {
            return Err(Error::InvalidSelfRequest);
        }

        if let Some(existing) = self.store.find_pair(&pair)? {
            return Err(match existing.status {
                EdgeStatus::Pending => Error::DuplicateRequest,
                EdgeStatus::Accepted => Error::AlreadyFriends,
                EdgeStatus::Blocked => Error::RequestBlocked,
            });
        }

        let edge = Edge::new(requester, target, EdgeStatus::Pending);
        match self.store.insert_edge(&edge) {
            Ok(()) => {}
            // Lost a race with a concurrent request for the same pair
            Err(StoreError::Conflict(_)) => return Err(Error::DuplicateRequest),
            Err(e) => return Err(e.into()),
        }

        info!(edge = %edge.id, from = requester, to = target, "friend request sent");
        self.notifier.notify(FriendshipEvent::RequestSent {
            edge_id: edge.id.clone(),
            from: requester.to_string(),
            to: target.to_string(),
        });
        Ok(edge)
    }

    /// Accept or decline a pending request.
    ///
    /// Returns the updated edge, or `None` when declining released the pair.
    pub fn respond(&self, edge_id: &str, response: Response) -> Result<Option<Edge>> {
        let mut edge = match self.store.get_edge(edge_id)? {
            Some(edge) if edge.status == EdgeStatus::Pending => edge,
            Some(edge) => {
                return Err(Error::InvalidTransition {
                    edge_id: edge_id.to_string(),
                    actual: edge.status.to_string(),
                })
            }
            None => {
                return Err(Error::InvalidTransition {
                    edge_id: edge_id.to_string(),
                    actual: "none".to_string(),
                })
            }
        };

        let requester = edge.requested_by.clone();
        let recipient = edge.recipient().to_string();

        match response {
            Response::Accept => {
                edge.transition(EdgeStatus::Accepted);
                self.store.update_edge(&edge)?;
                info!(edge = %edge.id, "friend request accepted");
                self.notifier.notify(FriendshipEvent::RequestAccepted {
                    edge_id: edge.id.clone(),
                    requester,
                    by: recipient,
                });
                Ok(Some(edge))
            }
            Response::Decline => {
                let result = match self.decline_policy {
                    DeclinePolicy::Release => {
                        self.store.delete_edge(&edge.id)?;
                        None
                    }
                    DeclinePolicy::Block => {
                        edge.transition(EdgeStatus::Blocked);
                        edge.blocked_by = Some(recipient.clone());
                        self.store.update_edge(&edge)?;
                        Some(edge.clone())
                    }
                };
                info!(edge = %edge.id, policy = ?self.decline_policy, "friend request declined");
                self.notifier.notify(FriendshipEvent::RequestDeclined {
                    edge_id: edge.id.clone(),
                    requester,
                    by: recipient,
                });
                Ok(result)
            }
        }
    }

    /// `blocker` blocks `target`, whatever the current relationship.
    pub fn block(&self, blocker: &str, target: &str) -> Result<Edge> {
        let pair = PairKey::new(blocker, target);
        if pair.is_self_pair() {
            return Err(Error::InvalidSelfRequest);
        }

        match self.block_pair(&pair, blocker, target)? {
            Some(edge) => Ok(edge),
            // A request landed in between; block that edge instead
            None => self.block_pair(&pair, blocker, target)?.ok_or_else(|| {
                Error::Store(format!("pair {} is indexed but has no edge", pair))
            }),
        }
    }

    /// One blocking attempt. `None` means the insert lost a race for the pair.
    fn block_pair(&self, pair: &PairKey, blocker: &str, target: &str) -> Result<Option<Edge>> {
        let edge = match self.store.find_pair(pair)? {
            Some(mut edge) => {
                if edge.status == EdgeStatus::Blocked {
                    debug!(edge = %edge.id, "pair already blocked");
                    return Ok(Some(edge));
                }
                edge.transition(EdgeStatus::Blocked);
                edge.blocked_by = Some(blocker.to_string());
                self.store.update_edge(&edge)?;
                edge
            }
            None => {
                let mut edge = Edge::new(blocker, target, EdgeStatus::Blocked);
                edge.blocked_by = Some(blocker.to_string());
                match self.store.insert_edge(&edge) {
                    Ok(()) => edge,
                    Err(StoreError::Conflict(_)) => return Ok(None),
                    Err(e) => return Err(e.into()),
                }
            }
        };

        info!(edge = %edge.id, by = blocker, blocked = target, "user blocked");
        self.notifier.notify(FriendshipEvent::Blocked {
            by: blocker.to_string(),
            target: target.to_string(),
        });
        Ok(Some(edge))
    }

    /// Delete the pair's edge whatever its status. `a` is the acting user.
    pub fn remove(&self, a: &str, b: &str) -> Result<Edge> {
        let pair = PairKey::new(a, b);
        let edge = self.store.find_pair(&pair)?.ok_or_else(|| Error::NoSuchEdge {
            a: a.to_string(),
            b: b.to_string(),
        })?;

        self.store.delete_edge(&edge.id)?;

        info!(edge = %edge.id, status = %edge.status, "relationship removed");
        self.notifier.notify(FriendshipEvent::Removed {
            by: a.to_string(),
            other: b.to_string(),
        });
        Ok(edge)
    }

    /// Current status between two users (`None` when no edge exists).
    pub fn status_between(&self, a: &str, b: &str) -> Result<Option<EdgeStatus>> {
        Ok(self.store.find_pair(&PairKey::new(a, b))?.map(|e| e.status))
    }

    /// Friends, sent requests and received requests for `user`.
    pub fn query(&self, user: &str) -> Result<FriendshipView> {
        let mut view = FriendshipView::default();
        for edge in self.store.edges_for(user)? {
            match edge.status {
                EdgeStatus::Accepted => {
                    if let Some(other) = edge.other(user) {
                        view.friends.push(other.to_string());
                    }
                }
                EdgeStatus::Pending if edge.requested_by == user => view.sent.push(edge),
                EdgeStatus::Pending => view.received.push(edge),
                EdgeStatus::Blocked => {}
            }
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEdgeStore;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<FriendshipEvent>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, event: FriendshipEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn machine() -> Friendships<MemoryEdgeStore> {
        Friendships::without_notifications(MemoryEdgeStore::new())
    }

    #[test]
    fn self_request_rejected() {
        let f = machine();
        assert_eq!(f.send_request("alice", "alice"), Err(Error::InvalidSelfRequest));
        assert!(f.store().is_empty());
    }

    #[test]
    fn duplicate_request_either_direction() {
        let f = machine();
        f.send_request("alice", "bob").unwrap();

        assert_eq!(f.send_request("alice", "bob"), Err(Error::DuplicateRequest));
        assert_eq!(f.send_request("bob", "alice"), Err(Error::DuplicateRequest));
        assert_eq!(f.store().len(), 1);
    }

    #[test]
    fn accepted_pair_rejects_new_request() {
        let f = machine();
        let edge = f.send_request("alice", "bob").unwrap();
        let accepted = f.respond(&edge.id, Response::Accept).unwrap().unwrap();
        assert_eq!(accepted.status, EdgeStatus::Accepted);

        assert_eq!(f.send_request("alice", "bob"), Err(Error::AlreadyFriends));
        assert_eq!(f.send_request("bob", "alice"), Err(Error::AlreadyFriends));
    }

    #[test]
    fn decline_with_block_policy_blocks_pair() {
        let f = machine().with_decline_policy(DeclinePolicy::Block);
        let edge = f.send_request("alice", "bob").unwrap();
        let declined = f.respond(&edge.id, Response::Decline).unwrap().unwrap();
        assert_eq!(declined.status, EdgeStatus::Blocked);
        assert_eq!(declined.blocked_by.as_deref(), Some("bob"));

        assert_eq!(f.send_request("alice", "bob"), Err(Error::RequestBlocked));
    }

    #[test]
    fn decline_with_release_policy_frees_pair() {
        let f = machine();
        assert_eq!(f.decline_policy(), DeclinePolicy::Release);

        let edge = f.send_request("alice", "bob").unwrap();
        assert_eq!(f.respond(&edge.id, Response::Decline).unwrap(), None);
        assert_eq!(f.status_between("alice", "bob").unwrap(), None);

        let again = f.send_request("alice", "bob").unwrap();
        assert_eq!(again.status, EdgeStatus::Pending);
    }

    #[test]
    fn respond_requires_pending() {
        let f = machine();
        let edge = f.send_request("alice", "bob").unwrap();
        f.respond(&edge.id, Response::Accept).unwrap();

        let err = f.respond(&edge.id, Response::Accept).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { ref actual, .. } if actual == "accepted"));

        let err = f.respond("missing", Response::Decline).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { ref actual, .. } if actual == "none"));
    }

    #[test]
    fn remove_then_request_again() {
        let f = machine();
        let edge = f.send_request("alice", "bob").unwrap();
        f.respond(&edge.id, Response::Accept).unwrap();

        let removed = f.remove("bob", "alice").unwrap();
        assert_eq!(removed.id, edge.id);

        let fresh = f.send_request("alice", "bob").unwrap();
        assert_eq!(fresh.status, EdgeStatus::Pending);
        assert_ne!(fresh.id, edge.id);
    }

    #[test]
    fn remove_blocked_pair() {
        let f = machine();
        f.block("alice", "bob").unwrap();
        assert_eq!(f.send_request("bob", "alice"), Err(Error::RequestBlocked));

        f.remove("alice", "bob").unwrap();
        f.send_request("bob", "alice").unwrap();
    }

    #[test]
    fn remove_missing_pair() {
        let f = machine();
        assert_eq!(
            f.remove("alice", "bob").unwrap_err(),
            Error::NoSuchEdge { a: "alice".into(), b: "bob".into() }
        );
    }

    #[test]
    fn block_overrides_friendship() {
        let f = machine();
        let edge = f.send_request("alice", "bob").unwrap();
        f.respond(&edge.id, Response::Accept).unwrap();

        let blocked = f.block("bob", "alice").unwrap();
        assert_eq!(blocked.id, edge.id);
        assert_eq!(blocked.status, EdgeStatus::Blocked);
        assert_eq!(blocked.blocked_by.as_deref(), Some("bob"));
        assert!(f.query("alice").unwrap().friends.is_empty());
        assert_eq!(f.block("alice", "alice"), Err(Error::InvalidSelfRequest));
    }

    /// Pair index entry whose edge record is gone.
    struct DanglingPair;

    impl EdgeStore for DanglingPair {
        fn find_pair(&self, _: &PairKey) -> std::result::Result<Option<Edge>, StoreError> {
            Ok(None)
        }
        fn get_edge(&self, _: &str) -> std::result::Result<Option<Edge>, StoreError> {
            Ok(None)
        }
        fn insert_edge(&self, edge: &Edge) -> std::result::Result<(), StoreError> {
            Err(StoreError::Conflict(edge.pair().to_string()))
        }
        fn update_edge(&self, _: &Edge) -> std::result::Result<(), StoreError> {
            Ok(())
        }
        fn delete_edge(&self, _: &str) -> std::result::Result<(), StoreError> {
            Ok(())
        }
        fn edges_for(&self, _: &str) -> std::result::Result<Vec<Edge>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn block_gives_up_on_dangling_pair() {
        let f = Friendships::without_notifications(DanglingPair);
        assert!(matches!(f.block("alice", "bob"), Err(Error::Store(_))));
    }

    #[test]
    fn query_splits_relationships() {
        let f = machine();
        let ab = f.send_request("alice", "bob").unwrap();
        f.respond(&ab.id, Response::Accept).unwrap();
        f.send_request("alice", "carol").unwrap();
        f.send_request("dave", "alice").unwrap();

        let view = f.query("alice").unwrap();
        assert_eq!(view.friends, vec!["bob".to_string()]);
        assert_eq!(view.sent.len(), 1);
        assert_eq!(view.sent[0].user_b, "carol");
        assert_eq!(view.received.len(), 1);
        assert_eq!(view.received[0].requested_by, "dave");

        // Bob is a friend, so absent from both request lists
        assert!(view.sent.iter().all(|e| !e.involves("bob")));
        assert!(view.received.iter().all(|e| !e.involves("bob")));

        let bob = f.query("bob").unwrap();
        assert_eq!(bob.friends, vec!["alice".to_string()]);
    }

    #[test]
    fn events_emitted_in_order() {
        let recorder = Arc::new(Recorder::default());
        let f = Friendships::new(MemoryEdgeStore::new(), Arc::clone(&recorder));

        let edge = f.send_request("alice", "bob").unwrap();
        f.respond(&edge.id, Response::Accept).unwrap();
        f.remove("alice", "bob").unwrap();
        // Rejections emit nothing
        let _ = f.send_request("alice", "alice");

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], FriendshipEvent::RequestSent { ref to, .. } if to == "bob"));
        assert!(matches!(
            events[1],
            FriendshipEvent::RequestAccepted { ref by, .. } if by == "bob"
        ));
        assert!(matches!(events[2], FriendshipEvent::Removed { .. }));
    }
}
