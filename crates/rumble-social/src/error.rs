//! Error types for rumble-social.

use crate::store::StoreError;
use thiserror::Error;

/// Result type for friendship operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejections returned by the friendship state machine.
///
/// Everything except [`Error::Store`] is a business-rule rejection meant to be
/// shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("cannot send a friend request to yourself")]
    InvalidSelfRequest,

    #[error("friend request already sent")]
    DuplicateRequest,

    #[error("you are already friends")]
    AlreadyFriends,

    #[error("cannot send friend request")]
    RequestBlocked,

    /// The edge is missing or not in a state that allows the requested move.
    #[error("invalid transition for edge {edge_id}: currently {actual}")]
    InvalidTransition { edge_id: String, actual: String },

    #[error("no relationship between {a} and {b}")]
    NoSuchEdge { a: String, b: String },

    /// The edge store failed.
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e.to_string())
    }
}
