//! Name-based deduplication of peer candidates

use super::decision::{CandidatePair, DecisionCache, DecisionProvider, Verdict};
use super::Candidate;
use crate::config::NamePolicy;
use crate::ticker::Ticker;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Normalized Levenshtein similarity of two display names, `1.0` when equal
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// How a pair of names is treated under a [`NamePolicy`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairClass {
    /// Different companies
    Distinct,
    /// Same company without doubt; the earlier candidate is kept
    UnambiguousDuplicate,
    /// Possibly the same company; a decision is required
    NeedsDecision(f64),
}

impl PairClass {
    /// Classify two display names
    pub fn classify(policy: NamePolicy, a: &str, b: &str) -> Self {
        match policy {
            NamePolicy::Exact => {
                if a == b {
                    PairClass::NeedsDecision(1.0)
                } else {
                    PairClass::Distinct
                }
            }
            NamePolicy::Fuzzy { lower, upper } => {
                if a == b {
                    return PairClass::UnambiguousDuplicate;
                }
                let score = name_similarity(a, b);
                if score >= upper {
                    PairClass::UnambiguousDuplicate
                } else if score > lower {
                    PairClass::NeedsDecision(score)
                } else {
                    PairClass::Distinct
                }
            }
        }
    }
}

/// Outcome of one deduplication pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// Tickers kept
    pub peers: BTreeSet<Ticker>,
    /// Tickers removed
    pub excluded: BTreeSet<Ticker>,
    /// Decisions requested from the provider in this pass
    pub decisions_requested: usize,
}

/// Pairwise deduplication under a name policy
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    policy: NamePolicy,
}

impl Deduplicator {
    /// Create a deduplicator
    pub fn new(policy: NamePolicy) -> Self {
        Self { policy }
    }

    /// Deduplicate `candidates`
    ///
    /// Pairs are visited in list order. Each unordered pair is decided at
    /// most once: decisions found in `cache` are replayed, new ones are
    /// requested from `decider` and recorded. A pair with a member already
    /// excluded is skipped, so an excluded ticker is never re-added.
    pub async fn run(
        &self,
        candidates: &[Candidate],
        cache: &mut DecisionCache,
        decider: &dyn DecisionProvider,
    ) -> DedupOutcome {
        let tickers: Vec<Ticker> = candidates.iter().map(Candidate::ticker).collect();
        let mut excluded = BTreeSet::new();
        let mut decisions_requested = 0;

        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (a, b) = (&tickers[i], &tickers[j]);
                if a == b || excluded.contains(a) || excluded.contains(b) {
                    continue;
                }

                let (first, second) = (&candidates[i], &candidates[j]);
                let verdict = match PairClass::classify(self.policy, &first.name, &second.name) {
                    PairClass::Distinct => continue,
                    PairClass::UnambiguousDuplicate => {
                        debug!(keep = %a, drop = %b, "Identical names");
                        Verdict::Keep(a.clone())
                    }
                    PairClass::NeedsDecision(similarity) => {
                        if let Some(verdict) = cache.get(a, b) {
                            verdict.clone()
                        } else {
                            let pair = CandidatePair {
                                first: first.clone(),
                                second: second.clone(),
                                similarity,
                            };
                            let decision = decider.decide(&pair).await;
                            decisions_requested += 1;
                            info!(first = %a, second = %b, ?decision, "Duplicate decided");

                            let verdict = Verdict::from_decision(decision, a, b);
                            cache.record(a, b, verdict.clone());
                            verdict
                        }
                    }
                };

                match verdict {
                    Verdict::Keep(winner) if &winner == a => {
                        excluded.insert(b.clone());
                    }
                    Verdict::Keep(_) => {
                        excluded.insert(a.clone());
                    }
                    Verdict::Neither => {
                        excluded.insert(a.clone());
                        excluded.insert(b.clone());
                    }
                }
            }
        }

        let peers = tickers
            .into_iter()
            .filter(|t| !excluded.contains(t))
            .collect();

        DedupOutcome {
            peers,
            excluded,
            decisions_requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Exchange;
    use crate::peers::decision::{Decision, FixedDecider};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted decisions and records every pair it was asked about
    #[derive(Default)]
    struct ScriptedDecider {
        answers: Mutex<VecDeque<Decision>>,
        asked: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedDecider {
        fn new(answers: &[Decision]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                asked: Mutex::default(),
            }
        }

        fn asked(&self) -> Vec<(String, String)> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DecisionProvider for ScriptedDecider {
        async fn decide(&self, pair: &CandidatePair) -> Decision {
            self.asked
                .lock()
                .unwrap()
                .push((pair.first.code.clone(), pair.second.code.clone()));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Decision::KeepNeither)
        }
    }

    fn acme_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("A", "Acme Inc", Exchange::Xetra),
            Candidate::new("B", "Acme Inc", Exchange::Us),
            Candidate::new("C", "Zeta Corp", Exchange::Us),
        ]
    }

    fn codes(set: &BTreeSet<Ticker>) -> Vec<String> {
        set.iter().map(|t| t.code().to_string()).collect()
    }

    #[test]
    fn test_classify_exact() {
        assert_eq!(
            PairClass::classify(NamePolicy::Exact, "Acme Inc", "Acme Inc"),
            PairClass::NeedsDecision(1.0)
        );
        assert_eq!(
            PairClass::classify(NamePolicy::Exact, "Acme Inc", "Acme Inc."),
            PairClass::Distinct
        );
    }

    #[test]
    fn test_classify_fuzzy() {
        let policy = NamePolicy::fuzzy();
        assert_eq!(
            PairClass::classify(policy, "Acme Inc", "Acme Inc"),
            PairClass::UnambiguousDuplicate
        );
        assert!(matches!(
            PairClass::classify(policy, "Acme Inc", "Acme Inc."),
            PairClass::NeedsDecision(score) if score > 0.8 && score < 1.0
        ));
        assert_eq!(
            PairClass::classify(policy, "Acme Inc", "Zeta Corp"),
            PairClass::Distinct
        );
    }

    #[test]
    fn test_name_similarity_bounds() {
        assert!((name_similarity("Same", "Same") - 1.0).abs() < f64::EPSILON);
        assert!(name_similarity("abc", "xyz") < 0.01);
    }

    #[tokio::test]
    async fn test_exact_policy_asks_once_and_keeps_first() {
        let decider = ScriptedDecider::new(&[Decision::KeepFirst]);
        let mut cache = DecisionCache::new();

        let outcome = Deduplicator::new(NamePolicy::Exact)
            .run(&acme_candidates(), &mut cache, &decider)
            .await;

        assert_eq!(decider.asked(), vec![("A".to_string(), "B".to_string())]);
        assert_eq!(outcome.decisions_requested, 1);
        assert_eq!(codes(&outcome.peers), vec!["A", "C"]);
        assert_eq!(codes(&outcome.excluded), vec!["B"]);
    }

    #[tokio::test]
    async fn test_keep_neither_drops_both() {
        let decider = ScriptedDecider::new(&[Decision::KeepNeither]);
        let mut cache = DecisionCache::new();

        let outcome = Deduplicator::new(NamePolicy::Exact)
            .run(&acme_candidates(), &mut cache, &decider)
            .await;

        assert_eq!(codes(&outcome.peers), vec!["C"]);
        assert_eq!(outcome.excluded.len(), 2);
    }

    #[tokio::test]
    async fn test_rerun_with_same_cache_is_idempotent() {
        let decider = ScriptedDecider::new(&[Decision::KeepSecond]);
        let mut cache = DecisionCache::new();
        let dedup = Deduplicator::new(NamePolicy::Exact);

        let first = dedup.run(&acme_candidates(), &mut cache, &decider).await;
        let second = dedup.run(&acme_candidates(), &mut cache, &decider).await;

        assert_eq!(first.peers, second.peers);
        assert_eq!(first.excluded, second.excluded);
        assert_eq!(second.decisions_requested, 0);
        assert_eq!(decider.asked().len(), 1);
    }

    #[tokio::test]
    async fn test_excluded_ticker_is_never_readded() {
        // A~B decided "keep B", then B~C decided "keep C": B must stay out
        // and A must not come back through the later pair.
        let candidates = vec![
            Candidate::new("A", "Acme Holdings", Exchange::Us),
            Candidate::new("B", "Acme Holding", Exchange::Lse),
            Candidate::new("C", "Acme Holding.", Exchange::Hk),
        ];
        let decider = ScriptedDecider::new(&[Decision::KeepSecond, Decision::KeepSecond]);
        let mut cache = DecisionCache::new();

        let outcome = Deduplicator::new(NamePolicy::fuzzy())
            .run(&candidates, &mut cache, &decider)
            .await;

        assert_eq!(codes(&outcome.peers), vec!["C"]);
        assert_eq!(codes(&outcome.excluded), vec!["A", "B"]);
        assert!(outcome.peers.is_disjoint(&outcome.excluded));
    }

    #[tokio::test]
    async fn test_fuzzy_identical_names_need_no_decision() {
        let decider = ScriptedDecider::new(&[]);
        let mut cache = DecisionCache::new();

        let outcome = Deduplicator::new(NamePolicy::fuzzy())
            .run(&acme_candidates(), &mut cache, &decider)
            .await;

        assert!(decider.asked().is_empty());
        assert_eq!(codes(&outcome.peers), vec!["A", "C"]);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_conservative_default_without_channel() {
        let mut cache = DecisionCache::new();

        let outcome = Deduplicator::new(NamePolicy::Exact)
            .run(&acme_candidates(), &mut cache, &FixedDecider::conservative())
            .await;

        assert_eq!(codes(&outcome.peers), vec!["C"]);
    }

    #[tokio::test]
    async fn test_triple_duplicate_asks_for_each_open_pair() {
        let candidates = vec![
            Candidate::new("A", "Acme Inc", Exchange::Xetra),
            Candidate::new("B", "Acme Inc", Exchange::Us),
            Candidate::new("D", "Acme Inc", Exchange::Lse),
        ];
        let decider = ScriptedDecider::new(&[Decision::KeepFirst, Decision::KeepFirst]);
        let mut cache = DecisionCache::new();

        let outcome = Deduplicator::new(NamePolicy::Exact)
            .run(&candidates, &mut cache, &decider)
            .await;

        assert_eq!(
            decider.asked(),
            vec![
                ("A".to_string(), "B".to_string()),
                ("A".to_string(), "D".to_string())
            ]
        );
        assert_eq!(codes(&outcome.peers), vec!["A"]);
    }
}
