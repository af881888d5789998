//! Search strategies over the parameter-subset lattice

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SearchStrategyKind;
use crate::types::{Candidate, SubsetMask};

use super::decision::{CandidateTally, Decision, DecisionEngine, DecisionOutcome};
use super::pattern::UrlPattern;
use super::scheduler::{CandidateJob, FetchScheduler};
use super::subsets::enumerate_candidates;

/// Everything a strategy needs to search one URL
pub struct SearchContext<'a> {
    pub pattern: &'a UrlPattern,
    pub scheduler: &'a FetchScheduler,
    /// Normalized baseline text
    pub baseline: Arc<str>,
    /// Also consider the bare URL with no parameters
    pub include_empty: bool,
}

/// Strategy for finding a satisfying parameter subset
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Search for the minimal subset. `engine` has seen the baseline.
    async fn search(&self, ctx: SearchContext<'_>, engine: DecisionEngine) -> Decision;
}

/// Build the strategy for a configured kind.
pub fn strategy_for(kind: SearchStrategyKind) -> Box<dyn SearchStrategy> {
    match kind {
        SearchStrategyKind::Exhaustive => Box::new(ExhaustiveSearch),
        SearchStrategyKind::Greedy => Box::new(GreedySearch),
    }
}

/// Run one round: score `candidates` through the scheduler and let the engine pick.
async fn run_round(
    ctx: &SearchContext<'_>,
    mut engine: DecisionEngine,
    candidates: Vec<Candidate>,
) -> Decision {
    engine.begin(&candidates);
    if engine.is_decided() {
        return engine.finalize();
    }

    let mut scores = ctx.scheduler.dispatch(CandidateJob {
        domain: ctx.pattern.domain().to_string(),
        baseline: Arc::clone(&ctx.baseline),
        candidates,
        cutoff: engine.cutoff(),
    });

    while let Some(score) = scores.recv().await {
        engine.record(score);
        if engine.is_decided() {
            break;
        }
    }

    engine.finalize()
}

/// Tests every subset in indicator order; the result has minimal cardinality.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveSearch;

#[async_trait]
impl SearchStrategy for ExhaustiveSearch {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    async fn search(&self, ctx: SearchContext<'_>, engine: DecisionEngine) -> Decision {
        let candidates = enumerate_candidates(ctx.pattern, ctx.include_empty);
        tracing::debug!(
            "Testing {} candidates for {}",
            candidates.len(),
            ctx.pattern.original()
        );
        run_round(&ctx, engine, candidates).await
    }
}

/// Removes one parameter per round while the page still matches.
///
/// Each round tests every subset one smaller than the current one and keeps
/// the first match in indicator order. Costs O(n²) fetches instead of 2ⁿ but
/// only finds a locally minimal subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySearch;

impl GreedySearch {
    fn children(mask: SubsetMask) -> Vec<SubsetMask> {
        let mut children: Vec<SubsetMask> = (0..64)
            .map(|bit| 1u64 << bit)
            .filter(|bit| mask & bit != 0)
            .map(|bit| mask & !bit)
            .collect();
        children.sort_unstable();
        children
    }
}

#[async_trait]
impl SearchStrategy for GreedySearch {
    fn name(&self) -> &'static str {
        "greedy"
    }

    async fn search(&self, ctx: SearchContext<'_>, engine: DecisionEngine) -> Decision {
        let threshold = engine.threshold();
        let ledger = engine.ledger();
        let floor = if ctx.include_empty { 0 } else { 1 };

        let mut current = ctx.pattern.full_mask();
        let mut current_similarity = None;
        let mut tally = CandidateTally::default();
        let mut engine = Some(engine);

        while current.count_ones() > floor {
            let candidates: Vec<_> = Self::children(current)
                .into_iter()
                .enumerate()
                .map(|(index, mask)| ctx.pattern.candidate(index, mask))
                .collect();

            let round_engine = engine.take().unwrap_or_else(|| {
                let mut fresh = DecisionEngine::new(threshold).with_ledger(ledger.clone());
                fresh.baseline_ready();
                fresh
            });
            let decision = run_round(&ctx, round_engine, candidates).await;
            tally.absorb(&decision.tally);

            match decision.outcome {
                DecisionOutcome::Minimal { mask, similarity } => {
                    tracing::debug!("Dropping to {:b} ({:.4}) for {}", mask, similarity, ctx.pattern.original());
                    current = mask;
                    current_similarity = Some(similarity);
                }
                _ => break,
            }
        }

        match current_similarity {
            Some(similarity) => Decision {
                outcome: DecisionOutcome::Minimal {
                    mask: current,
                    similarity,
                },
                tally,
            },
            None => Decision::full_set(tally),
        }
    }
}
