use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use crate::types::ScoreEvent;

/// Best observed score per player.
///
/// Keys are 20-byte addresses compared bytewise, so mixed-case hex
/// encodings of the same player collapse to a single entry. Built fresh
/// per aggregation and discarded after ranking.
pub type ScoreMap = HashMap<Address, U256>;

/// Folds an unordered stream of score events into the best score per
/// player.
///
/// A score replaces the stored one only when strictly greater, so ties
/// keep the first-seen value. The fold is idempotent and commutative:
/// duplicates are no-ops and any permutation of the input produces the
/// same map.
#[must_use]
pub fn fold_scores<I>(events: I) -> ScoreMap
where
    I: IntoIterator<Item = ScoreEvent>,
{
    let mut best = ScoreMap::new();
    for event in events {
        best.entry(event.player)
            .and_modify(|score| {
                if event.score > *score {
                    *score = event.score;
                }
            })
            .or_insert(event.score);
    }
    best
}
