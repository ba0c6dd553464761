//! Chunked on-chain scanner that folds `ScoreSubmitted` events into a
//! ranked tap-game leaderboard.
//!
//! Every fetch re-queries the ledger in sequential, bounded block ranges,
//! folds the resulting events into the best score per player, and returns
//! a capped, deterministically ordered leaderboard. A bounded "recent
//! window" scan escalates to one exhaustive full-history scan when it
//! fails or finds nothing; unrecoverable failures surface as an empty
//! result, never as an error.
//!
//! Example usage:
//!
//! ```rust,no_run
//! use alloy::{network::Ethereum, primitives::address, transports::http::reqwest::Url};
//! use scoreboard_scanner::ScoreboardBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scoreboard =
//!         ScoreboardBuilder::new(address!("0xf64d1D8c1F6e8F0e0dFe676Af84f69cA3A3B0482"))
//!             .with_recent_window(5_000)
//!             .with_origin_block(19_000_000)
//!             .connect_http::<Ethereum>(Url::parse("https://mainnet.base.org")?);
//!
//!     for (position, entry) in scoreboard.recent_leaderboard().await.iter().enumerate() {
//!         println!("{}. {} {}", position + 1, entry.player, entry.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod event_source;
pub mod range_planner;
pub mod ranker;
pub mod rpc_source;
pub mod scanner;
pub mod types;

pub use aggregator::{ScoreMap, fold_scores};
pub use event_source::{ScoreEventSource, SourceError};
pub use range_planner::{RangePlan, RangePlanError, ScanPolicy};
pub use ranker::rank;
pub use rpc_source::RpcScoreSource;
pub use scanner::{CancelToken, ScanError, ScanOutcome, Scoreboard, ScoreboardBuilder};
pub use types::{LeaderboardEntry, ScoreEvent, ScoreSubmitted};
