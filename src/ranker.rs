use crate::{aggregator::ScoreMap, types::LeaderboardEntry};

/// Ranks a score map into a display-ready leaderboard.
///
/// Entries are ordered by score descending; equal scores tie-break by
/// player address ascending so a given map always ranks the same way.
/// The result is truncated to `cap` entries. An empty map yields an
/// empty vec.
#[must_use]
pub fn rank(scores: ScoreMap, cap: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> =
        scores.into_iter().map(|(player, score)| LeaderboardEntry { player, score }).collect();
    entries.sort_unstable_by(|a, b| b.score.cmp(&a.score).then_with(|| a.player.cmp(&b.player)));
    entries.truncate(cap);
    entries
}
