//! RhymeRumble Friendships
//!
//! A friend relationship is a single edge between an unordered pair of users.
//!
//! # States
//!
//! ```text
//!            send_request            respond(Accept)
//!   NONE ─────────────────→ PENDING ─────────────────→ ACCEPTED
//!    ↑                         │                          │
//!    │   respond(Decline)      │ respond(Decline)         │
//!    ├───── [Release] ─────────┘  [Block]                 │
//!    │                            ↓                       │
//!    │                         BLOCKED ←──── block ───────┘
//!    │                            │
//!    └────────── remove ──────────┴──────── remove ───────
//! ```
//!
//! `NONE` is implicit: no edge is stored for the pair.
//!
//! # Pair identity
//!
//! `{A, B}` and `{B, A}` are the same pair. Lookups go through [`PairKey`],
//! which stores the two ids in sorted order. A store must never hold two
//! edges for one `PairKey`.
//!
//! # Collaborators
//!
//! - [`EdgeStore`]: persistence, and the final word on pair uniqueness
//! - [`Notifier`]: fire-and-forget events for user-facing display

mod edge;
mod error;
mod machine;
mod notify;
mod store;

pub use edge::{Edge, EdgeId, EdgeStatus, PairKey, UserId, now_millis};
pub use error::{Error, Result};
pub use machine::{DeclinePolicy, FriendshipView, Friendships, Response};
pub use notify::{FriendshipEvent, NoopNotifier, Notifier};
pub use store::{EdgeStore, MemoryEdgeStore, StoreError};
