//! RhymeRumble Leaderboard
//!
//! Turns per-user contribution counts into a totally ordered leaderboard.
//!
//! # Scoring
//!
//! Every poem, like and battle win is worth a fixed number of points:
//!
//! ```text
//! score = poems_written × 5 + likes_received × 2 + battles_won × 10
//! ```
//!
//! # Ordering
//!
//! Entries are sorted by score, highest first. Equal scores fall back to
//! `user_id` ascending so the order never depends on input order. Ranks are
//! plain positions (1, 2, 3, ...): tied scores still get distinct ranks.
//!
//! The engine is a pure function over a snapshot. Callers are expected to
//! hand it at most one record per user.

mod leaderboard;
mod record;

pub use leaderboard::{position_of, rank, score, top};
pub use record::{ContributionRecord, LeaderboardEntry, UserId};

/// Points per poem written.
pub const POEM_WEIGHT: i64 = 5;

/// Points per like received.
pub const LIKE_WEIGHT: i64 = 2;

/// Points per battle won.
pub const WIN_WEIGHT: i64 = 10;
