//! Minimal-subset decision
//!
//! The engine owns one URL's comparison state: an arena of scores indexed by
//! candidate index. Because candidate indices follow indicator order, the
//! satisfying candidate with the smallest index is the minimal subset, and
//! it can be declared as soon as every smaller index has been scored.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::types::{AnalysisError, Candidate, CandidateScore, SubsetMask};

use super::scheduler::NO_CUTOFF;

/// Lifecycle of one URL's analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    PendingBaseline,
    Enumerating,
    AwaitingOutcomes,
}

/// Counts behind a decision, kept for logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateTally {
    pub total: usize,
    pub scored: usize,
    pub matched: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl CandidateTally {
    /// Add another round's counts to this one.
    pub fn absorb(&mut self, other: &CandidateTally) {
        self.total += other.total;
        self.scored += other.scored;
        self.matched += other.matched;
        self.failed += other.failed;
        self.cancelled += other.cancelled;
    }
}

/// Running tally of a URL's search, readable from outside the search.
///
/// Engines publish their counts here as scores arrive, so a search that is
/// abandoned at its deadline can still be accounted for. Rounds that have
/// concluded are settled; the open round counts unscored candidates as
/// cancelled.
#[derive(Debug, Clone, Default)]
pub struct TallyLedger {
    inner: Arc<Mutex<LedgerState>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    settled: CandidateTally,
    open: CandidateTally,
}

impl TallyLedger {
    fn update(&self, round: CandidateTally) {
        self.inner.lock().open = round;
    }

    fn settle(&self, round: CandidateTally) {
        let mut state = self.inner.lock();
        state.settled.absorb(&round);
        state.open = CandidateTally::default();
    }

    /// Settled rounds plus the open one
    pub fn snapshot(&self) -> CandidateTally {
        let state = self.inner.lock();
        let mut tally = state.settled;
        tally.absorb(&state.open);
        tally
    }
}

/// What the search concluded for a URL
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// This subset reproduces the baseline
    Minimal { mask: SubsetMask, similarity: f64 },
    /// No proper subset was found; every parameter is required
    FullSet,
    /// The URL could not be analyzed
    Failed(AnalysisError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub outcome: DecisionOutcome,
    pub tally: CandidateTally,
}

impl Decision {
    pub fn full_set(tally: CandidateTally) -> Self {
        Self {
            outcome: DecisionOutcome::FullSet,
            tally,
        }
    }

    pub fn failed(error: AnalysisError, tally: CandidateTally) -> Self {
        Self {
            outcome: DecisionOutcome::Failed(error),
            tally,
        }
    }
}

/// Per-URL decision state machine
///
/// `PendingBaseline -> Enumerating -> AwaitingOutcomes`, then `finalize` or
/// `fail` consumes the engine. Scores for indices above the current best
/// are discarded on arrival.
#[derive(Debug)]
pub struct DecisionEngine {
    threshold: f64,
    phase: AnalysisPhase,
    masks: Vec<SubsetMask>,
    scores: Vec<Option<CandidateScore>>,
    received: usize,
    matched: usize,
    failed: usize,
    best: Option<usize>,
    cutoff: Arc<AtomicUsize>,
    ledger: TallyLedger,
}

impl DecisionEngine {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            phase: AnalysisPhase::PendingBaseline,
            masks: Vec::new(),
            scores: Vec::new(),
            received: 0,
            matched: 0,
            failed: 0,
            best: None,
            cutoff: Arc::new(AtomicUsize::new(NO_CUTOFF)),
            ledger: TallyLedger::default(),
        }
    }

    /// Publish counts to `ledger` instead of a private one.
    pub fn with_ledger(mut self, ledger: TallyLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> TallyLedger {
        self.ledger.clone()
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Cancellation cutoff to share with the dispatcher
    pub fn cutoff(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.cutoff)
    }

    /// The baseline is available; candidates may be generated.
    pub fn baseline_ready(&mut self) {
        if self.phase == AnalysisPhase::PendingBaseline {
            self.phase = AnalysisPhase::Enumerating;
        }
    }

    /// Register the candidates whose outcomes will be recorded.
    pub fn begin(&mut self, candidates: &[Candidate]) {
        self.masks = candidates.iter().map(|c| c.subset.mask).collect();
        self.scores = vec![None; candidates.len()];
        self.received = 0;
        self.matched = 0;
        self.failed = 0;
        self.best = None;
        self.cutoff.store(NO_CUTOFF, Ordering::Release);
        self.phase = AnalysisPhase::AwaitingOutcomes;
        self.ledger.update(self.tally());
    }

    /// Record a scored outcome. A later score for the same index replaces the earlier one.
    pub fn record(&mut self, score: CandidateScore) {
        if self.phase != AnalysisPhase::AwaitingOutcomes {
            tracing::debug!("Ignoring score for #{} outside of AwaitingOutcomes", score.index);
            return;
        }
        let index = score.index;
        if index >= self.scores.len() || self.best.is_some_and(|best| index > best) {
            return;
        }

        let satisfies = score.satisfies(self.threshold);
        let failed = score.error.is_some();
        match self.scores[index].replace(score) {
            None => self.received += 1,
            Some(previous) => {
                if previous.satisfies(self.threshold) {
                    self.matched -= 1;
                }
                if previous.error.is_some() {
                    self.failed -= 1;
                }
            }
        }
        if satisfies {
            self.matched += 1;
        }
        if failed {
            self.failed += 1;
        }

        if satisfies && self.best.map_or(true, |best| index < best) {
            self.best = Some(index);
            self.cutoff.fetch_min(index, Ordering::AcqRel);
        }
        self.ledger.update(self.tally());
    }

    /// Whether the minimal satisfying candidate is known.
    pub fn is_decided(&self) -> bool {
        if self.phase != AnalysisPhase::AwaitingOutcomes {
            return false;
        }
        match self.best {
            Some(best) => self.scores[..best].iter().all(Option::is_some),
            None => self.received == self.scores.len(),
        }
    }

    pub fn tally(&self) -> CandidateTally {
        CandidateTally {
            total: self.scores.len(),
            scored: self.received,
            matched: self.matched,
            failed: self.failed,
            cancelled: self.scores.len() - self.received,
        }
    }

    /// Conclude with whatever has been recorded.
    ///
    /// Missing outcomes count as non-matching.
    pub fn finalize(self) -> Decision {
        let tally = self.tally();
        self.ledger.settle(tally);
        let outcome = match self.best {
            Some(best) => {
                let similarity = self.scores[best]
                    .as_ref()
                    .and_then(|s| s.similarity)
                    .unwrap_or_default();
                DecisionOutcome::Minimal {
                    mask: self.masks[best],
                    similarity,
                }
            }
            None => DecisionOutcome::FullSet,
        };
        Decision { outcome, tally }
    }

    /// Conclude with a fatal error.
    pub fn fail(self, error: AnalysisError) -> Decision {
        let tally = self.tally();
        self.ledger.settle(tally);
        Decision::failed(error, tally)
    }
}
