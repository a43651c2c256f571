//! Session state for the current user.
//!
//! The session is an owned value with exactly one writer ([`SessionHandle`]).
//! Everyone else observes it through a `watch::Receiver`, so there is no
//! shared mutable global and no racing setters.
//!
//! ```text
//!             Restored(None)
//!   Loading ───────────────────→ Anonymous ←───────────┐
//!      │                           │  ↑                │
//!      │ Restored(Some)   SignedIn │  │ SignedOut      │
//!      ↓                           ↓  │                │
//!   Authenticated ←────────────────┘──┘                │
//!
//!   any ── Failed ──→ Failed ── SignedIn / Restored / SignedOut ──┘
//! ```

use crate::error::{Error, Result};
use serde::Serialize;
use tokio::sync::watch;

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Initial: the stored session has not been checked yet
    Loading,
    Anonymous,
    Authenticated { user_id: String, username: String },
    Failed { reason: String },
}

impl SessionState {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { user_id, .. } => Some(user_id.as_str()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated { .. } => "authenticated",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// Inputs that move the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Result of the initial session check
    Restored(Option<(String, String)>),
    SignedIn { user_id: String, username: String },
    SignedOut,
    Failed(String),
}

impl SessionState {
    /// Pure transition function. Illegal moves are rejected.
    pub fn apply(&self, event: SessionEvent) -> Result<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        let next = match (self, event) {
            (_, E::Failed(reason)) => S::Failed { reason },

            (S::Loading | S::Failed { .. }, E::Restored(None)) => S::Anonymous,
            (S::Loading | S::Failed { .. }, E::Restored(Some((user_id, username)))) => {
                S::Authenticated { user_id, username }
            }

            (S::Anonymous | S::Failed { .. }, E::SignedIn { user_id, username }) => {
                S::Authenticated { user_id, username }
            }

            (S::Authenticated { .. } | S::Failed { .. }, E::SignedOut) => S::Anonymous,

            (state, event) => {
                return Err(Error::InvalidInput(format!(
                    "session event {:?} not allowed while {}",
                    event,
                    state.name()
                )))
            }
        };
        Ok(next)
    }
}

/// The single writer of a session.
pub struct SessionHandle {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// New session in `Loading`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Loading);
        Self { tx }
    }

    /// Current state.
    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Apply an event; observers see the new state only if it is legal.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<SessionState> {
        let next = self.current().apply(event)?;
        tracing::debug!(state = next.name(), "session transition");
        self.tx.send_replace(next.clone());
        Ok(next)
    }
}
