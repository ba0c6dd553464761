use std::{ops::RangeInclusive, time::Duration};

use alloy::{
    network::{Ethereum, Network},
    primitives::{Address, BlockNumber},
    providers::{Provider, RootProvider},
    rpc::types::Filter,
    sol_types::SolEvent,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::{
    event_source::{ScoreEventSource, SourceError},
    types::{ScoreEvent, ScoreSubmitted},
};

// RPC retry and timeout settings
/// Overall timeout for a single source call, including its retries.
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(30);
/// Default maximum number of retry attempts.
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// Default base delay between retries.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);

/// [`ScoreEventSource`] over an alloy provider.
///
/// Every RPC call runs under exponential backoff capped by `max_retries`
/// and an overall `max_timeout`. A span wider than `max_block_range` is
/// rejected before touching the wire: the planner guarantees it never
/// emits one, so such a range is an invariant violation, not a condition
/// to recover from.
#[derive(Clone, Debug)]
pub struct RpcScoreSource<N: Network = Ethereum> {
    provider: RootProvider<N>,
    contract_address: Address,
    max_block_range: u64,
    max_timeout: Duration,
    max_retries: usize,
    min_delay: Duration,
}

impl<N: Network> RpcScoreSource<N> {
    #[must_use]
    pub fn new(provider: RootProvider<N>, contract_address: Address, max_block_range: u64) -> Self {
        Self {
            provider,
            contract_address,
            max_block_range,
            max_timeout: DEFAULT_MAX_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }

    /// Sets the overall timeout for a single source call.
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    /// Sets the maximum number of retry attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay for exponential backoff retries.
    #[must_use]
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    fn score_filter(&self, range: &RangeInclusive<BlockNumber>) -> Filter {
        Filter::new()
            .address(self.contract_address)
            .event_signature(ScoreSubmitted::SIGNATURE_HASH)
            .from_block(*range.start())
            .to_block(*range.end())
    }

    fn ensure_span(&self, range: &RangeInclusive<BlockNumber>) -> Result<(), SourceError> {
        let span = range.end().saturating_sub(*range.start()).saturating_add(1);
        if span > self.max_block_range {
            return Err(SourceError::RangeTooLarge { span, limit: self.max_block_range });
        }
        Ok(())
    }

    /// Execute `operation` with exponential backoff and a total timeout.
    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T, SourceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let retry_strategy = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        timeout(
            self.max_timeout,
            operation
                .retry(retry_strategy)
                .notify(|err: &RpcError<TransportErrorKind>, dur: Duration| {
                    info!(error = %err, "RPC error, retrying after {dur:?}");
                })
                .sleep(tokio::time::sleep),
        )
        .await
        .map_err(SourceError::from)?
        .map_err(SourceError::from)
    }

    async fn fetch_events(
        &self,
        filter: Filter,
        range: &RangeInclusive<BlockNumber>,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        let result = self.with_retry(|| async { self.provider.get_logs(&filter).await }).await;

        match result {
            Ok(logs) => {
                if !logs.is_empty() {
                    debug!(log_count = logs.len(), block_range = ?range, "found score logs");
                }
                Ok(logs.iter().filter_map(ScoreEvent::from_log).collect())
            }
            Err(err) => {
                error!(error = %err, block_range = ?range, "eth_getLogs failed");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<N: Network> ScoreEventSource for RpcScoreSource<N> {
    async fn latest_block(&self) -> Result<BlockNumber, SourceError> {
        let result = self.with_retry(|| async { self.provider.get_block_number().await }).await;
        if let Err(err) = &result {
            error!(error = %err, "eth_blockNumber failed");
        }
        result
    }

    async fn score_events(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        self.ensure_span(&range)?;
        self.fetch_events(self.score_filter(&range), &range).await
    }

    async fn score_events_for(
        &self,
        range: RangeInclusive<BlockNumber>,
        player: Address,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        self.ensure_span(&range)?;
        let filter = self.score_filter(&range).topic1(player.into_word());
        self.fetch_events(filter, &range).await
    }
}
