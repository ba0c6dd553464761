use std::{ops::RangeInclusive, sync::Mutex};

use alloy::primitives::{Address, BlockNumber, U256, address};
use async_trait::async_trait;
use scoreboard_scanner::{
    CancelToken, ScoreEvent, ScoreEventSource, ScoreboardBuilder, SourceError,
};

pub const CONTRACT: Address = address!("0xf64d1D8c1F6e8F0e0dFe676Af84f69cA3A3B0482");
pub const PLAYER_A1: Address = address!("0x00000000000000000000000000000000000000A1");
pub const PLAYER_B2: Address = address!("0x00000000000000000000000000000000000000B2");

/// Scripted in-memory ledger used in place of a live RPC source.
///
/// Records every queried range in call order, can fail the first N range
/// queries or every query overlapping a configured range, and can cancel a
/// shared token on its first query to exercise mid-scan cancellation.
pub struct MockSource {
    latest: BlockNumber,
    events: Vec<ScoreEvent>,
    failing: Vec<RangeInclusive<BlockNumber>>,
    fail_first_calls: usize,
    calls: Mutex<Vec<RangeInclusive<BlockNumber>>>,
    cancel_on_first_call: Option<CancelToken>,
}

impl MockSource {
    #[must_use]
    pub fn new(latest: BlockNumber) -> Self {
        Self {
            latest,
            events: Vec::new(),
            failing: Vec::new(),
            fail_first_calls: 0,
            calls: Mutex::new(Vec::new()),
            cancel_on_first_call: None,
        }
    }

    #[must_use]
    pub fn with_event(mut self, player: Address, score: u64, block_number: BlockNumber) -> Self {
        self.events.push(ScoreEvent { player, score: U256::from(score), block_number });
        self
    }

    /// Every query overlapping `range` fails with a transient error.
    #[must_use]
    pub fn failing_range(mut self, range: RangeInclusive<BlockNumber>) -> Self {
        self.failing.push(range);
        self
    }

    /// The first `count` range queries fail with a transient error.
    #[must_use]
    pub fn failing_first_calls(mut self, count: usize) -> Self {
        self.fail_first_calls = count;
        self
    }

    /// Cancels `token` as soon as the first range query arrives.
    #[must_use]
    pub fn cancel_on_first_call(mut self, token: CancelToken) -> Self {
        self.cancel_on_first_call = Some(token);
        self
    }

    pub fn recorded_calls(&self) -> Vec<RangeInclusive<BlockNumber>> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, range: &RangeInclusive<BlockNumber>) -> Result<(), SourceError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(range.clone());
            calls.len() - 1
        };
        if let Some(token) = &self.cancel_on_first_call {
            token.cancel();
        }
        if call_index < self.fail_first_calls {
            return Err(SourceError::Timeout);
        }
        let overlaps = |failing: &RangeInclusive<BlockNumber>| {
            failing.start() <= range.end() && range.start() <= failing.end()
        };
        if self.failing.iter().any(overlaps) {
            return Err(SourceError::Timeout);
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreEventSource for MockSource {
    async fn latest_block(&self) -> Result<BlockNumber, SourceError> {
        Ok(self.latest)
    }

    async fn score_events(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        self.record(&range)?;
        Ok(self.events.iter().filter(|event| range.contains(&event.block_number)).cloned().collect())
    }
}

/// Builder preconfigured for the mock ledger: origin at genesis, default
/// chunking and cap.
#[must_use]
pub fn test_builder() -> ScoreboardBuilder {
    ScoreboardBuilder::new(CONTRACT)
}
