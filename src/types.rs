use alloy::{
    primitives::{Address, BlockNumber, U256},
    rpc::types::Log,
    sol,
    sol_types::SolEvent,
};
use tracing::warn;

sol! {
    /// Canonical event emitted by the scoreboard contract for every
    /// submitted run. Decoding depends on exactly this name and argument
    /// order.
    #[derive(Debug, PartialEq, Eq)]
    event ScoreSubmitted(address indexed player, uint256 score);
}

/// One score observation decoded from the ledger. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEvent {
    pub player: Address,
    pub score: U256,
    pub block_number: BlockNumber,
}

impl ScoreEvent {
    /// Decodes a raw log into a [`ScoreEvent`].
    ///
    /// Returns `None` for logs that are not `ScoreSubmitted`, fail to
    /// decode, or carry no block number. Skipped logs are reported via
    /// `warn!` and never abort aggregation.
    #[must_use]
    pub fn from_log(log: &Log) -> Option<Self> {
        if log.topic0() != Some(&ScoreSubmitted::SIGNATURE_HASH) {
            return None;
        }

        let Some(block_number) = log.block_number else {
            warn!(tx_hash = ?log.transaction_hash, "skipping pending ScoreSubmitted log");
            return None;
        };

        match log.log_decode::<ScoreSubmitted>() {
            Ok(decoded) => {
                let ScoreSubmitted { player, score } = decoded.inner.data;
                Some(Self { player, score, block_number })
            }
            Err(err) => {
                warn!(error = %err, block_number, "skipping undecodable ScoreSubmitted log");
                None
            }
        }
    }
}

/// Externally visible leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player: Address,
    pub score: U256,
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, Bytes, Log as PrimitiveLog, LogData, address};

    use super::*;

    const CONTRACT: Address = address!("0xf64d1D8c1F6e8F0e0dFe676Af84f69cA3A3B0482");

    fn score_log(player: Address, score: u64, block_number: Option<BlockNumber>) -> Log {
        let data = ScoreSubmitted { player, score: U256::from(score) }.encode_log_data();
        Log { inner: PrimitiveLog { address: CONTRACT, data }, block_number, ..Log::default() }
    }

    #[test]
    fn event_signature_is_bit_exact() {
        assert_eq!(ScoreSubmitted::SIGNATURE, "ScoreSubmitted(address,uint256)");
    }

    #[test]
    fn decodes_score_submitted_log() {
        let player = address!("0x00000000000000000000000000000000000000A1");
        let log = score_log(player, 7, Some(42));

        let event = ScoreEvent::from_log(&log).expect("log should decode");

        assert_eq!(event.player, player);
        assert_eq!(event.score, U256::from(7));
        assert_eq!(event.block_number, 42);
    }

    #[test]
    fn skips_log_with_foreign_topic() {
        let data = LogData::new_unchecked(vec![B256::ZERO], Bytes::new());
        let log = Log {
            inner: PrimitiveLog { address: CONTRACT, data },
            block_number: Some(42),
            ..Log::default()
        };

        assert!(ScoreEvent::from_log(&log).is_none());
    }

    #[test]
    fn skips_log_without_block_number() {
        let player = address!("0x00000000000000000000000000000000000000A1");
        let log = score_log(player, 7, None);

        assert!(ScoreEvent::from_log(&log).is_none());
    }

    #[test]
    fn skips_log_with_truncated_data() {
        let player = address!("0x00000000000000000000000000000000000000A1");
        let data = LogData::new_unchecked(
            vec![ScoreSubmitted::SIGNATURE_HASH, player.into_word()],
            Bytes::from_static(&[0u8; 8]),
        );
        let log = Log {
            inner: PrimitiveLog { address: CONTRACT, data },
            block_number: Some(42),
            ..Log::default()
        };

        assert!(ScoreEvent::from_log(&log).is_none());
    }
}
