//! Industry peer-group resolution
//!
//! [`PeerGroupResolver`] looks up the seed ticker's industry on the screener,
//! gathers same-industry listings across the configured exchanges and removes
//! listings that look like the same company, asking a [`DecisionProvider`]
//! when the names alone do not settle it.

pub mod decision;
pub mod dedup;
pub mod resolver;

pub use decision::{
    CandidatePair, Decision, DecisionCache, DecisionProvider, FixedDecider, InteractiveDecider,
    Verdict,
};
pub use dedup::{DedupOutcome, Deduplicator, PairClass, name_similarity};
pub use resolver::{IndustryMatch, PeerGroupResolver};

use crate::config::Exchange;
use crate::ticker::Ticker;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A same-industry listing returned by the screener
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Ticker code without suffix
    pub code: String,
    /// Company display name
    pub name: String,
    /// Exchange the listing was found on
    pub exchange: Exchange,
}

impl Candidate {
    /// Create a candidate
    pub fn new(code: impl Into<String>, name: impl Into<String>, exchange: Exchange) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            exchange,
        }
    }

    /// Full ticker including the exchange suffix
    pub fn ticker(&self) -> Ticker {
        Ticker::new(self.code.as_str(), self.exchange)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ticker())
    }
}

/// Non-fatal conditions met during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ListingWarning {
    /// The seed code is listed on more than one configured exchange; the
    /// record of `chosen` (the first in search order) was used
    AmbiguousListing {
        code: String,
        exchanges: Vec<Exchange>,
        chosen: Exchange,
    },
}

impl fmt::Display for ListingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingWarning::AmbiguousListing {
                code,
                exchanges,
                chosen,
            } => {
                let listed: Vec<&str> = exchanges.iter().map(Exchange::code).collect();
                write!(
                    f,
                    "{code} is listed on {}; using {chosen}",
                    listed.join(", ")
                )
            }
        }
    }
}

/// Result of one resolution run
#[derive(Debug, Clone, Serialize)]
pub struct PeerGroup {
    /// Seed ticker as given, suffix stripped
    pub seed: Ticker,
    /// Industry the peers were searched in
    pub industry: String,
    /// Exchange whose record supplied the industry
    pub source_exchange: Exchange,
    /// Distinct same-industry tickers, seed excluded
    pub peers: BTreeSet<Ticker>,
    /// Tickers removed as duplicates
    pub excluded: BTreeSet<Ticker>,
    /// Warnings raised along the way
    pub warnings: Vec<ListingWarning>,
}

impl PeerGroup {
    /// Number of peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peer was found
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether the seed was found on several exchanges
    pub fn is_ambiguous(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ListingWarning::AmbiguousListing { .. }))
    }
}
