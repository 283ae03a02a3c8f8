//! Industry peer groups and fundamentals comparisons
//!
//! This crate builds on the EOD Historical Data screener and fundamentals
//! services. It includes:
//!
//! - Peer-group resolution: the seed ticker's industry, same-industry
//!   listings across exchanges, and removal of listings that are the same
//!   company under another ticker
//! - Financial statements (balance sheet, income statement, cash flow)
//! - Headline KPIs ("Highlights") with a report of tickers lacking data
//! - Focal ticker vs. peer-group average comparison
//! - Time series of statement line items for chart sinks
//! - Competitors from an index constituents list
//!
//! # Architecture
//!
//! The upstream services sit behind the [`ScreenerApi`] and
//! [`FundamentalsApi`] traits, implemented over HTTP by [`EodClient`]
//! (rate limited, retried, cached). Near-duplicate listings are settled by a
//! [`DecisionProvider`]: [`InteractiveDecider`] prompts on the terminal,
//! [`FixedDecider`] answers the same way every time.
//!
//! # Example
//!
//! ```rust,ignore
//! use peerscope::{EodClient, FixedDecider, PeerConfig, PeerGroupResolver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PeerConfig::default().with_env_api_key();
//!     let client = Arc::new(EodClient::new(&config)?);
//!
//!     let resolver = PeerGroupResolver::new(client, Arc::new(FixedDecider::conservative()), &config);
//!     let group = resolver.resolve("SAP").await?;
//!
//!     for peer in &group.peers {
//!         println!("{peer}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod chart;
pub mod compare;
pub mod config;
pub mod constituents;
pub mod error;
pub mod fundamentals;
pub mod peers;
pub mod retry;
pub mod ticker;

// Re-export main types for convenience
pub use api::{EodClient, FundamentalsApi, FundamentalsRecord, ScreenerApi, ScreenerQuery, ScreenerRecord};
pub use chart::{ChartSink, RecordingSink, TextChart, TimeSeries};
pub use compare::{GroupComparison, KPIS, MarketOverview, group_average, market_overview};
pub use config::{Exchange, NamePolicy, PeerConfig};
pub use constituents::ConstituentsList;
pub use error::{PeerError, Result};
pub use fundamentals::{
    Batch, FetchReport, Frequency, Highlights, StatementKind, StatementTable, highlights, statements,
};
pub use peers::{
    Decision, DecisionCache, DecisionProvider, FixedDecider, InteractiveDecider, ListingWarning,
    PeerGroup, PeerGroupResolver,
};
pub use retry::RetryPolicy;
pub use ticker::Ticker;
