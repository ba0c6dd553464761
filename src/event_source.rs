use std::{ops::RangeInclusive, sync::Arc};

use alloy::{
    primitives::{Address, BlockNumber},
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use thiserror::Error;
use tokio::time::error as TokioError;

use crate::types::ScoreEvent;

#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("operation timed out")]
    Timeout,

    #[error("RPC call failed after exhausting all retry attempts: {0}")]
    Rpc(Arc<RpcError<TransportErrorKind>>),

    #[error("query span of {span} blocks exceeds the source limit of {limit}")]
    RangeTooLarge { span: u64, limit: u64 },
}

impl From<RpcError<TransportErrorKind>> for SourceError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        SourceError::Rpc(Arc::new(err))
    }
}

impl From<TokioError::Elapsed> for SourceError {
    fn from(_: TokioError::Elapsed) -> Self {
        SourceError::Timeout
    }
}

/// Read-only window onto the ledger's score submissions.
///
/// Implementations must tolerate ranges being queried in any order and may
/// be called concurrently from independent scans.
#[async_trait]
pub trait ScoreEventSource: Send + Sync {
    /// Current chain tip.
    async fn latest_block(&self) -> Result<BlockNumber, SourceError>;

    /// All score events within `range` (inclusive), in no guaranteed order.
    async fn score_events(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<ScoreEvent>, SourceError>;

    /// Score events within `range` for a single player.
    ///
    /// The default implementation filters client-side; sources with
    /// server-side filtering (e.g. indexed topics) should override it.
    async fn score_events_for(
        &self,
        range: RangeInclusive<BlockNumber>,
        player: Address,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        let events = self.score_events(range).await?;
        Ok(events.into_iter().filter(|event| event.player == player).collect())
    }
}

#[async_trait]
impl<S: ScoreEventSource + ?Sized> ScoreEventSource for Arc<S> {
    async fn latest_block(&self) -> Result<BlockNumber, SourceError> {
        self.as_ref().latest_block().await
    }

    async fn score_events(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        self.as_ref().score_events(range).await
    }

    async fn score_events_for(
        &self,
        range: RangeInclusive<BlockNumber>,
        player: Address,
    ) -> Result<Vec<ScoreEvent>, SourceError> {
        self.as_ref().score_events_for(range, player).await
    }
}
