//! Peer group resolution against the screener

use super::decision::{DecisionCache, DecisionProvider};
use super::dedup::{DedupOutcome, Deduplicator};
use super::{Candidate, ListingWarning, PeerGroup};
use crate::api::{ScreenerApi, ScreenerQuery, ScreenerRecord};
use crate::config::{Exchange, NamePolicy, PeerConfig};
use crate::error::{PeerError, Result};
use crate::ticker::Ticker;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where the seed ticker was found and which industry it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryMatch {
    /// Screener record of the first matching exchange
    pub record: ScreenerRecord,
    /// Exchange that record came from
    pub exchange: Exchange,
    /// Industry of the record
    pub industry: String,
    /// Set when the seed was found on more than one exchange
    pub warning: Option<ListingWarning>,
}

/// Finds the distinct same-industry peers of a seed ticker
///
/// Every upstream call is awaited in turn; one run owns its candidate list,
/// exclusion set and decision cache.
pub struct PeerGroupResolver {
    screener: Arc<dyn ScreenerApi>,
    decider: Arc<dyn DecisionProvider>,
    exchanges: Vec<Exchange>,
    limit: u32,
    policy: NamePolicy,
}

impl PeerGroupResolver {
    /// Create a resolver using the exchanges, limit and policy of `config`
    pub fn new(
        screener: Arc<dyn ScreenerApi>,
        decider: Arc<dyn DecisionProvider>,
        config: &PeerConfig,
    ) -> Self {
        Self {
            screener,
            decider,
            exchanges: config.exchanges.clone(),
            limit: config.limit,
            policy: config.name_policy,
        }
    }

    /// Override the per-exchange result limit
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Override the exchanges searched
    pub fn with_exchanges(mut self, exchanges: Vec<Exchange>) -> Self {
        self.exchanges = exchanges;
        self
    }

    /// Override the name policy
    pub fn with_policy(mut self, policy: NamePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve the peer group of `seed` with a fresh decision cache
    pub async fn resolve(&self, seed: &str) -> Result<PeerGroup> {
        let mut cache = DecisionCache::new();
        self.resolve_with_cache(seed, &mut cache).await
    }

    /// Resolve the peer group of `seed`, replaying decisions found in `cache`
    #[instrument(skip(self, cache))]
    pub async fn resolve_with_cache(
        &self,
        seed: &str,
        cache: &mut DecisionCache,
    ) -> Result<PeerGroup> {
        let seed: Ticker = seed.parse()?;
        let seed = seed.strip_suffix();

        let found = self.resolve_industry(&seed).await?;
        let candidates = self
            .gather_candidates(&found.industry, seed.code())
            .await?;

        let DedupOutcome {
            peers,
            excluded,
            decisions_requested,
        } = self.deduplicate(&candidates, cache).await;

        info!(
            seed = %seed,
            industry = %found.industry,
            candidates = candidates.len(),
            peers = peers.len(),
            excluded = excluded.len(),
            decisions_requested,
            "Peer group resolved"
        );

        Ok(PeerGroup {
            seed,
            industry: found.industry,
            source_exchange: found.exchange,
            peers,
            excluded,
            warnings: found.warning.into_iter().collect(),
        })
    }

    /// Find the seed's industry on the first exchange listing its code
    pub async fn resolve_industry(&self, seed: &Ticker) -> Result<IndustryMatch> {
        let code = seed.code();
        let mut matches: Vec<(Exchange, ScreenerRecord)> = Vec::new();

        for &exchange in &self.exchanges {
            let records = self
                .screener
                .screen(&ScreenerQuery::by_code(code, exchange))
                .await
                .map_err(PeerError::into_service_error)?;

            if let Some(record) = records
                .into_iter()
                .find(|r| r.code.eq_ignore_ascii_case(code))
            {
                debug!(%exchange, name = %record.name, "Seed listing found");
                matches.push((exchange, record));
            }
        }

        let exchanges: Vec<Exchange> = matches.iter().map(|(e, _)| *e).collect();
        let Some((exchange, record)) = matches.into_iter().next() else {
            return Err(PeerError::NotFound(format!(
                "{code} is not listed on any configured exchange"
            )));
        };

        let warning = (exchanges.len() > 1).then(|| {
            let warning = ListingWarning::AmbiguousListing {
                code: code.to_string(),
                exchanges,
                chosen: exchange,
            };
            warn!("Ambiguous listing: {}", warning);
            warning
        });

        let industry = record
            .industry
            .as_deref()
            .map(str::trim)
            .filter(|industry| !industry.is_empty())
            .ok_or_else(|| {
                PeerError::ServiceError(format!(
                    "screener record for {code} on {exchange} carries no industry"
                ))
            })?
            .to_string();

        Ok(IndustryMatch {
            record,
            exchange,
            industry,
            warning,
        })
    }

    /// Collect same-industry listings across all exchanges
    ///
    /// Order is exchange order, then upstream rank. An exchange answering with
    /// fewer than two rows contributes nothing; listings of `seed_code` are
    /// left out.
    pub async fn gather_candidates(&self, industry: &str, seed_code: &str) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();

        for &exchange in &self.exchanges {
            let records = self
                .screener
                .screen(&ScreenerQuery::by_industry(industry, exchange, self.limit))
                .await
                .map_err(PeerError::into_service_error)?;

            if records.len() < 2 {
                debug!(%exchange, rows = records.len(), "Too few listings, skipping exchange");
                continue;
            }

            for record in records {
                if record.code.eq_ignore_ascii_case(seed_code) {
                    continue;
                }
                let candidate = Candidate::new(record.code, record.name, exchange);
                if seen.insert(candidate.ticker()) {
                    candidates.push(candidate);
                }
            }
        }

        debug!(industry, count = candidates.len(), "Candidates gathered");
        Ok(candidates)
    }

    /// Run the deduplication pass with this resolver's policy and decider
    pub async fn deduplicate(
        &self,
        candidates: &[Candidate],
        cache: &mut DecisionCache,
    ) -> DedupOutcome {
        Deduplicator::new(self.policy)
            .run(candidates, cache, self.decider.as_ref())
            .await
    }
}
