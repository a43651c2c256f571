//! Leaderboard input and output records.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque user identifier handed out by the identity provider.
pub type UserId = String;

/// Aggregated contribution counts for one user.
///
/// Counts are signed: a negative value is not rejected, it just lowers the
/// score.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContributionRecord {
    pub user_id: UserId,
    pub poems_written: i64,
    pub likes_received: i64,
    pub battles_won: i64,
}

impl ContributionRecord {
    /// Create a record from raw counts.
    pub fn new(
        user_id: impl Into<UserId>,
        poems_written: i64,
        likes_received: i64,
        battles_won: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            poems_written,
            likes_received,
            battles_won,
        }
    }

    /// An all-zero record, for users with no activity yet.
    pub fn empty(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, 0, 0, 0)
    }
}

/// One row of a computed leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub score: i64,
    /// 1-based position, 1 = highest score.
    pub rank: u32,
    pub poems_written: i64,
    pub likes_received: i64,
    pub battles_won: i64,
}
