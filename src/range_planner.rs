use std::ops::RangeInclusive;

use alloy::primitives::BlockNumber;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangePlanError {
    #[error("invalid block range: from block {from} is above to block {to}")]
    InvalidRange { from: BlockNumber, to: BlockNumber },

    #[error("max block range must be at least 1")]
    ZeroChunkSize,
}

/// Origin selection for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPolicy {
    /// Bounded lookback from the chain tip. Cheap, may miss older entries.
    Recent { window: u64 },
    /// Everything from a configured lower bound. Exhaustive but expensive.
    Full { origin: BlockNumber },
}

impl ScanPolicy {
    /// Resolves the first block this policy scans from, given the tip.
    ///
    /// A full-history origin above the tip degrades to a single-block scan
    /// rather than an invalid range.
    #[must_use]
    pub fn origin_block(&self, latest: BlockNumber) -> BlockNumber {
        match *self {
            ScanPolicy::Recent { window } => latest.saturating_sub(window),
            ScanPolicy::Full { origin } => origin.min(latest),
        }
    }
}

/// Lazy, restartable sequence of block ranges covering `[from, to]`.
///
/// Ranges are emitted in ascending order, contiguous and non-overlapping,
/// each spanning at most `max_block_range` blocks, with the final range
/// clipped to `to`. Spans shorter than one chunk emit exactly one range.
/// Cloning the plan restarts it from its current position.
#[derive(Debug, Clone)]
pub struct RangePlan {
    next: Option<BlockNumber>,
    to: BlockNumber,
    max_block_range: u64,
}

impl RangePlan {
    /// Creates a plan for `[from, to]` in chunks of `max_block_range`.
    ///
    /// # Errors
    ///
    /// * `RangePlanError::InvalidRange` - if `from > to`.
    /// * `RangePlanError::ZeroChunkSize` - if `max_block_range == 0`.
    pub fn new(
        from: BlockNumber,
        to: BlockNumber,
        max_block_range: u64,
    ) -> Result<Self, RangePlanError> {
        if max_block_range == 0 {
            return Err(RangePlanError::ZeroChunkSize);
        }
        if from > to {
            return Err(RangePlanError::InvalidRange { from, to });
        }
        Ok(Self { next: Some(from), to, max_block_range })
    }
}

impl Iterator for RangePlan {
    type Item = RangeInclusive<BlockNumber>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.max_block_range - 1).min(self.to);
        self.next = if end < self.to { Some(end + 1) } else { None };
        Some(start..=end)
    }
}
