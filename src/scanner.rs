use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use alloy::{
    network::Network,
    primitives::{Address, BlockNumber, U256},
    providers::RootProvider,
    rpc::client::ClientBuilder,
    transports::{TransportResult, http::reqwest::Url, ws::WsConnect},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    aggregator::fold_scores,
    event_source::{ScoreEventSource, SourceError},
    range_planner::{RangePlan, RangePlanError, ScanPolicy},
    ranker::rank,
    rpc_source::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_TIMEOUT, DEFAULT_MIN_DELAY, RpcScoreSource},
    types::{LeaderboardEntry, ScoreEvent},
};

/// Default maximum span of a single source query, in blocks.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 1000;

/// Default lookback for bounded scans, in blocks.
pub const DEFAULT_RECENT_WINDOW: u64 = 10_000;

/// Default lower bound for exhaustive scans. Deployments should override
/// this with the scoreboard contract's deployment block.
pub const DEFAULT_ORIGIN_BLOCK: BlockNumber = 0;

/// Default maximum number of leaderboard entries returned.
pub const DEFAULT_RESULT_CAP: usize = 10;

#[derive(Error, Debug, Clone)]
pub enum ScanError {
    #[error("range planning failed: {0}")]
    Plan(#[from] RangePlanError),

    #[error("event source error: {0}")]
    Source(#[from] SourceError),
}

/// Result of a cancellable leaderboard scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan ran to completion (possibly with an empty result).
    Complete(Vec<LeaderboardEntry>),
    /// The scan was cancelled between chunk queries.
    Cancelled,
}

/// Cooperative cancellation handle.
///
/// Cancellation is checked between chunk queries; an in-flight RPC is
/// bounded by the source timeout rather than interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
struct Config {
    max_block_range: u64,
    recent_window: u64,
    origin_block: BlockNumber,
    result_cap: usize,
}

pub struct ScoreboardBuilder {
    contract_address: Address,
    max_block_range: u64,
    recent_window: u64,
    origin_block: BlockNumber,
    result_cap: usize,
    max_timeout: Duration,
    max_retries: usize,
    min_delay: Duration,
}

impl ScoreboardBuilder {
    #[must_use]
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            recent_window: DEFAULT_RECENT_WINDOW,
            origin_block: DEFAULT_ORIGIN_BLOCK,
            result_cap: DEFAULT_RESULT_CAP,
            max_timeout: DEFAULT_MAX_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }

    /// Sets the maximum span of a single source query, in blocks.
    #[must_use]
    pub fn with_max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range;
        self
    }

    /// Sets the default lookback for bounded scans, in blocks.
    #[must_use]
    pub fn with_recent_window(mut self, recent_window: u64) -> Self {
        self.recent_window = recent_window;
        self
    }

    /// Sets the lower bound for exhaustive scans, normally the scoreboard
    /// contract's deployment block.
    #[must_use]
    pub fn with_origin_block(mut self, origin_block: BlockNumber) -> Self {
        self.origin_block = origin_block;
        self
    }

    /// Sets the maximum number of leaderboard entries returned.
    #[must_use]
    pub fn with_result_cap(mut self, result_cap: usize) -> Self {
        self.result_cap = result_cap;
        self
    }

    /// Sets the overall timeout for a single source call.
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    /// Sets the maximum number of retry attempts per source call.
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

    /// Connects to the provider via WebSocket.
    ///
    /// Final builder method: consumes the builder and returns the built
    /// [`Scoreboard`].
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails
    pub async fn connect_ws<N: Network>(
        self,
        ws_url: Url,
    ) -> TransportResult<Scoreboard<RpcScoreSource<N>>> {
        let provider =
            RootProvider::<N>::new(ClientBuilder::default().ws(WsConnect::new(ws_url)).await?);
        Ok(self.connect(provider))
    }

    /// Connects to the provider via HTTP.
    ///
    /// Final builder method: consumes the builder and returns the built
    /// [`Scoreboard`].
    #[must_use]
    pub fn connect_http<N: Network>(self, url: Url) -> Scoreboard<RpcScoreSource<N>> {
        let provider = RootProvider::<N>::new(ClientBuilder::default().http(url));
        self.connect(provider)
    }

    /// Connects to an existing provider.
    ///
    /// Final builder method: consumes the builder and returns the built
    /// [`Scoreboard`].
    #[must_use]
    pub fn connect<N: Network>(self, provider: RootProvider<N>) -> Scoreboard<RpcScoreSource<N>> {
        let source = RpcScoreSource::new(provider, self.contract_address, self.max_block_range)
            .with_max_timeout(self.max_timeout)
            .with_max_retries(self.max_retries)
            .with_min_delay(self.min_delay);
        self.with_source(source)
    }

    /// Uses a custom event source.
    ///
    /// Final builder method: consumes the builder and returns the built
    /// [`Scoreboard`].
    #[must_use]
    pub fn with_source<S: ScoreEventSource>(self, source: S) -> Scoreboard<S> {
        Scoreboard {
            source,
            config: Config {
                max_block_range: self.max_block_range,
                recent_window: self.recent_window,
                origin_block: self.origin_block,
                result_cap: self.result_cap,
            },
        }
    }
}

enum Scan {
    Complete(Vec<ScoreEvent>),
    Cancelled,
}

/// Leaderboard fetch orchestrator.
///
/// Every call re-queries the ledger in sequential chunks and builds its
/// own aggregate; there is no cache and no state shared between
/// invocations, so any number of calls may run concurrently.
pub struct Scoreboard<S> {
    source: S,
    config: Config,
}

impl<S: ScoreEventSource> Scoreboard<S> {
    /// Ranked leaderboard from the default recent window.
    ///
    /// Escalates to exactly one full-history scan when the bounded scan
    /// fails or finds nothing. Never fails: unrecoverable errors are
    /// logged and yield an empty vec.
    pub async fn recent_leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.recent_leaderboard_within(self.config.recent_window).await
    }

    /// Same as [`recent_leaderboard`](Self::recent_leaderboard) with an
    /// explicit lookback window.
    pub async fn recent_leaderboard_within(&self, window: u64) -> Vec<LeaderboardEntry> {
        self.complete_or_empty(ScanPolicy::Recent { window }).await
    }

    /// Ranked leaderboard over the full configured history. Never fails:
    /// unrecoverable errors are logged and yield an empty vec.
    pub async fn full_leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.complete_or_empty(ScanPolicy::Full { origin: self.config.origin_block }).await
    }

    /// Cancellable leaderboard scan under an explicit policy.
    ///
    /// Bounded scans escalate to one full-history scan on failure or an
    /// empty result; cancellation is checked between chunk queries and
    /// reported as [`ScanOutcome::Cancelled`], distinct from both success
    /// and failure.
    pub async fn leaderboard(&self, policy: ScanPolicy, cancel: &CancelToken) -> ScanOutcome {
        match self.events_with_fallback(policy, cancel).await {
            Ok(Scan::Complete(events)) => {
                ScanOutcome::Complete(rank(fold_scores(events), self.config.result_cap))
            }
            Ok(Scan::Cancelled) => ScanOutcome::Cancelled,
            Err(err) => {
                error!(error = %err, "leaderboard scan failed, returning empty result");
                ScanOutcome::Complete(Vec::new())
            }
        }
    }

    /// Best score ever submitted by `player`.
    ///
    /// Scans the full configured history restricted to the player. Returns
    /// `None` when the player has no submissions or the scan fails.
    pub async fn player_best_score(&self, player: Address) -> Option<U256> {
        match self.scan_player_events(player).await {
            Ok(events) => fold_scores(events).remove(&player),
            Err(err) => {
                error!(error = %err, %player, "player score scan failed");
                None
            }
        }
    }

    async fn complete_or_empty(&self, policy: ScanPolicy) -> Vec<LeaderboardEntry> {
        match self.leaderboard(policy, &CancelToken::new()).await {
            ScanOutcome::Complete(entries) => entries,
            // a freshly created token is never cancelled
            ScanOutcome::Cancelled => Vec::new(),
        }
    }

    async fn events_with_fallback(
        &self,
        policy: ScanPolicy,
        cancel: &CancelToken,
    ) -> Result<Scan, ScanError> {
        let full = ScanPolicy::Full { origin: self.config.origin_block };
        match (self.scan_events(policy, cancel).await, policy) {
            // only the bounded strategy escalates, and only once
            (Ok(Scan::Complete(events)), ScanPolicy::Recent { .. }) if events.is_empty() => {
                info!("bounded scan found no events, escalating to full history");
                self.scan_events(full, cancel).await
            }
            (Err(err), ScanPolicy::Recent { .. }) => {
                warn!(error = %err, "bounded scan failed, escalating to full history");
                self.scan_events(full, cancel).await
            }
            (result, _) => result,
        }
    }

    async fn scan_events(
        &self,
        policy: ScanPolicy,
        cancel: &CancelToken,
    ) -> Result<Scan, ScanError> {
        let latest = self.source.latest_block().await?;
        let from = policy.origin_block(latest);
        let plan = RangePlan::new(from, latest, self.config.max_block_range)?;

        let mut events = Vec::new();
        let mut chunk_count = 0u64;
        for range in plan {
            if cancel.is_cancelled() {
                info!(completed_chunks = chunk_count, "scan cancelled between chunk queries");
                return Ok(Scan::Cancelled);
            }

            let mut batch = self.source.score_events(range).await?;
            events.append(&mut batch);

            chunk_count += 1;
            if chunk_count % 10 == 0 {
                debug!(chunk_count, "processed scan chunks");
            }
        }

        debug!(
            chunk_count,
            event_count = events.len(),
            from_block = from,
            to_block = latest,
            "scan complete"
        );

        Ok(Scan::Complete(events))
    }

    async fn scan_player_events(&self, player: Address) -> Result<Vec<ScoreEvent>, ScanError> {
        let latest = self.source.latest_block().await?;
        let from = ScanPolicy::Full { origin: self.config.origin_block }.origin_block(latest);
        let plan = RangePlan::new(from, latest, self.config.max_block_range)?;

        let mut events = Vec::new();
        for range in plan {
            let mut batch = self.source.score_events_for(range, player).await?;
            events.append(&mut batch);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn test_builder() -> ScoreboardBuilder {
        ScoreboardBuilder::new(address!("0xf64d1D8c1F6e8F0e0dFe676Af84f69cA3A3B0482"))
    }

    #[test]
    fn builder_defaults_match_constants() {
        let builder = test_builder();

        assert_eq!(builder.max_block_range, DEFAULT_MAX_BLOCK_RANGE);
        assert_eq!(builder.recent_window, DEFAULT_RECENT_WINDOW);
        assert_eq!(builder.origin_block, DEFAULT_ORIGIN_BLOCK);
        assert_eq!(builder.result_cap, DEFAULT_RESULT_CAP);
        assert_eq!(builder.max_timeout, DEFAULT_MAX_TIMEOUT);
        assert_eq!(builder.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(builder.min_delay, DEFAULT_MIN_DELAY);
    }

    #[test]
    fn builder_methods_update_configuration() {
        let builder = test_builder()
            .with_max_block_range(500)
            .with_recent_window(5000)
            .with_origin_block(19_000_000)
            .with_result_cap(25)
            .with_max_timeout(Duration::from_secs(5))
            .with_max_retries(7)
            .with_min_delay(Duration::from_millis(250));

        assert_eq!(builder.max_block_range, 500);
        assert_eq!(builder.recent_window, 5000);
        assert_eq!(builder.origin_block, 19_000_000);
        assert_eq!(builder.result_cap, 25);
        assert_eq!(builder.max_timeout, Duration::from_secs(5));
        assert_eq!(builder.max_retries, 7);
        assert_eq!(builder.min_delay, Duration::from_millis(250));
    }

    #[test]
    fn builder_last_call_wins() {
        let builder = test_builder()
            .with_max_block_range(25)
            .with_max_block_range(55)
            .with_recent_window(100)
            .with_recent_window(200);

        assert_eq!(builder.max_block_range, 55);
        assert_eq!(builder.recent_window, 200);
    }

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        // observed by clones sharing the flag
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }
}
