//! Score computation and rank assignment.

use crate::record::{ContributionRecord, LeaderboardEntry};
use crate::{LIKE_WEIGHT, POEM_WEIGHT, WIN_WEIGHT};
use std::cmp::Ordering;

/// Compute the score of a single record.
///
/// Saturates at the `i64` bounds instead of overflowing.
///
/// # Examples
///
/// ```
/// use rumble_ranking::{score, ContributionRecord};
///
/// assert_eq!(score(&ContributionRecord::new("u1", 10, 20, 1)), 100);
/// assert_eq!(score(&ContributionRecord::empty("u2")), 0);
/// ```
pub fn score(record: &ContributionRecord) -> i64 {
    record
        .poems_written
        .saturating_mul(POEM_WEIGHT)
        .saturating_add(record.likes_received.saturating_mul(LIKE_WEIGHT))
        .saturating_add(record.battles_won.saturating_mul(WIN_WEIGHT))
}

/// Build the full leaderboard for a snapshot of contribution records.
///
/// Highest score first, ties broken by `user_id` ascending. Ranks run
/// `1..=records.len()` with no gaps and no shared positions.
pub fn rank(records: &[ContributionRecord]) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(i64, &ContributionRecord)> =
        records.iter().map(|r| (score(r), r)).collect();

    scored.sort_by(|(sa, a), (sb, b)| match sb.cmp(sa) {
        Ordering::Equal => a.user_id.cmp(&b.user_id),
        other => other,
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (score, record))| LeaderboardEntry {
            user_id: record.user_id.clone(),
            score,
            rank: index as u32 + 1,
            poems_written: record.poems_written,
            likes_received: record.likes_received,
            battles_won: record.battles_won,
        })
        .collect()
}

/// The first `limit` entries of [`rank`].
pub fn top(records: &[ContributionRecord], limit: usize) -> Vec<LeaderboardEntry> {
    let mut board = rank(records);
    board.truncate(limit);
    board
}

/// Find a user's row in an already computed leaderboard.
pub fn position_of<'a>(
    entries: &'a [LeaderboardEntry],
    user_id: &str,
) -> Option<&'a LeaderboardEntry> {
    entries.iter().find(|e| e.user_id == user_id)
}
