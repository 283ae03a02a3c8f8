//! Decisions on near-duplicate candidates
//!
//! The resolver never talks to a console itself. It asks a
//! [`DecisionProvider`], which is either [`InteractiveDecider`] (operator
//! prompt) or [`FixedDecider`] (automated runs).

use super::Candidate;
use crate::ticker::Ticker;
use async_trait::async_trait;
use dialoguer::Select;
use serde::Serialize;
use std::collections::HashMap;
use std::io::IsTerminal;
use tracing::warn;

/// Outcome for a pair of candidates that may be the same company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Decision {
    /// Keep the first candidate, drop the second
    KeepFirst,
    /// Keep the second candidate, drop the first
    KeepSecond,
    /// Drop both
    #[default]
    KeepNeither,
}

/// Two candidates whose names matched under the active policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePair {
    pub first: Candidate,
    pub second: Candidate,
    /// Name similarity in `0.0..=1.0`
    pub similarity: f64,
}

/// Source of decisions for near-duplicate pairs
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Decide which of the two candidates to keep
    ///
    /// Must not block indefinitely: without a response channel return
    /// [`Decision::KeepNeither`].
    async fn decide(&self, pair: &CandidatePair) -> Decision;
}

/// Always returns the same outcome; for automated pipelines
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDecider {
    outcome: Decision,
}

impl FixedDecider {
    /// Decider returning `outcome` for every pair
    pub fn new(outcome: Decision) -> Self {
        Self { outcome }
    }

    /// Decider that drops both members of every pair
    pub fn conservative() -> Self {
        Self::new(Decision::KeepNeither)
    }
}

#[async_trait]
impl DecisionProvider for FixedDecider {
    async fn decide(&self, _pair: &CandidatePair) -> Decision {
        self.outcome
    }
}

/// Asks the operator on the terminal
///
/// Falls back to [`Decision::KeepNeither`] when stdin is not a terminal or
/// the prompt fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveDecider;

impl InteractiveDecider {
    /// Create an interactive decider
    pub fn new() -> Self {
        Self
    }

    fn prompt(pair: &CandidatePair) -> Decision {
        let title = format!(
            "Possible duplicate listing ({:.0}% name similarity)",
            pair.similarity * 100.0
        );
        let items = [
            format!("Keep {}", pair.first),
            format!("Keep {}", pair.second),
            "Keep neither".to_string(),
        ];

        match Select::new()
            .with_prompt(title)
            .items(&items)
            .default(2)
            .interact_opt()
        {
            Ok(Some(0)) => Decision::KeepFirst,
            Ok(Some(1)) => Decision::KeepSecond,
            Ok(_) => Decision::KeepNeither,
            Err(e) => {
                warn!("Decision prompt failed, keeping neither: {}", e);
                Decision::KeepNeither
            }
        }
    }
}

#[async_trait]
impl DecisionProvider for InteractiveDecider {
    async fn decide(&self, pair: &CandidatePair) -> Decision {
        if !std::io::stdin().is_terminal() {
            warn!(
                first = %pair.first,
                second = %pair.second,
                "No terminal attached, keeping neither"
            );
            return Decision::KeepNeither;
        }

        let pair = pair.clone();
        match tokio::task::spawn_blocking(move || Self::prompt(&pair)).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Decision prompt aborted, keeping neither: {}", e);
                Decision::KeepNeither
            }
        }
    }
}

/// A recorded decision, expressed independently of pair order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// This ticker stays, the other member of the pair goes
    Keep(Ticker),
    /// Both members go
    Neither,
}

impl Verdict {
    /// Translate a decision on `(first, second)`
    pub fn from_decision(decision: Decision, first: &Ticker, second: &Ticker) -> Self {
        match decision {
            Decision::KeepFirst => Verdict::Keep(first.clone()),
            Decision::KeepSecond => Verdict::Keep(second.clone()),
            Decision::KeepNeither => Verdict::Neither,
        }
    }
}

/// Decisions taken in one resolution run, keyed by unordered pair
///
/// A recorded decision is never replaced.
#[derive(Debug, Clone, Default)]
pub struct DecisionCache {
    decisions: HashMap<(Ticker, Ticker), Verdict>,
}

impl DecisionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &Ticker, b: &Ticker) -> (Ticker, Ticker) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    /// Decision recorded for the pair, in either order
    pub fn get(&self, a: &Ticker, b: &Ticker) -> Option<&Verdict> {
        self.decisions.get(&Self::key(a, b))
    }

    /// Record a decision; returns `false` if the pair was already decided
    pub fn record(&mut self, a: &Ticker, b: &Ticker, verdict: Verdict) -> bool {
        match self.decisions.entry(Self::key(a, b)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(verdict);
                true
            }
        }
    }

    /// Number of decided pairs
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Whether nothing was decided yet
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Exchange;

    fn pair() -> CandidatePair {
        CandidatePair {
            first: Candidate::new("A", "Acme Inc", Exchange::Us),
            second: Candidate::new("B", "Acme Inc.", Exchange::Lse),
            similarity: 0.9,
        }
    }

    #[tokio::test]
    async fn test_fixed_decider() {
        assert_eq!(
            FixedDecider::new(Decision::KeepSecond).decide(&pair()).await,
            Decision::KeepSecond
        );
        assert_eq!(
            FixedDecider::conservative().decide(&pair()).await,
            Decision::KeepNeither
        );
        assert_eq!(FixedDecider::default().decide(&pair()).await, Decision::KeepNeither);
    }

    #[test]
    fn test_provider_as_trait_object() {
        let providers: Vec<Box<dyn DecisionProvider>> = vec![
            Box::new(FixedDecider::new(Decision::KeepFirst)),
            Box::new(FixedDecider::conservative()),
        ];
        let decisions: Vec<Decision> = providers
            .iter()
            .map(|p| tokio_test::block_on(p.decide(&pair())))
            .collect();
        assert_eq!(decisions, vec![Decision::KeepFirst, Decision::KeepNeither]);
    }

    #[test]
    fn test_verdict_from_decision() {
        let a: Ticker = "A.US".parse().unwrap();
        let b: Ticker = "B.LSE".parse().unwrap();

        assert_eq!(
            Verdict::from_decision(Decision::KeepFirst, &a, &b),
            Verdict::Keep(a.clone())
        );
        assert_eq!(
            Verdict::from_decision(Decision::KeepSecond, &a, &b),
            Verdict::Keep(b.clone())
        );
        assert_eq!(
            Verdict::from_decision(Decision::KeepNeither, &a, &b),
            Verdict::Neither
        );
    }

    #[test]
    fn test_decision_cache_is_order_independent() {
        let a: Ticker = "A.US".parse().unwrap();
        let b: Ticker = "B.LSE".parse().unwrap();
        let mut cache = DecisionCache::new();

        assert!(cache.record(&b, &a, Verdict::Keep(a.clone())));
        assert_eq!(cache.get(&a, &b), Some(&Verdict::Keep(a.clone())));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_decision_cache_never_overwrites() {
        let a: Ticker = "A.US".parse().unwrap();
        let b: Ticker = "B.LSE".parse().unwrap();
        let mut cache = DecisionCache::new();

        assert!(cache.record(&a, &b, Verdict::Neither));
        assert!(!cache.record(&a, &b, Verdict::Keep(a.clone())));
        assert_eq!(cache.get(&a, &b), Some(&Verdict::Neither));
    }
}
