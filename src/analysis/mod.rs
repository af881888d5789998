//! Minimal-parameter discovery engine
//!
//! For a URL with query parameters, finds the smallest subset of those
//! parameters whose rendered page is still equivalent to the original.
//!
//! ```text
//! UrlPattern -> SubsetEnumerator -> FetchScheduler -> DecisionEngine -> ResultAssembler
//!                                     (fan out)         (fan in)
//! ```

pub mod analyzer;
pub mod assembler;
pub mod decision;
pub mod normalizer;
pub mod pattern;
pub mod renderer;
pub mod scheduler;
pub mod similarity;
pub mod strategy;
pub mod subsets;
pub mod throttle;

pub use analyzer::{Analyzer, InvalidOptions};
pub use assembler::ResultAssembler;
pub use decision::{AnalysisPhase, CandidateTally, Decision, DecisionEngine, DecisionOutcome, TallyLedger};
pub use normalizer::ContentNormalizer;
pub use pattern::{QueryParam, UrlPattern};
pub use renderer::{HttpRenderer, RenderedPage, Renderer};
pub use scheduler::{CandidateJob, FetchPolicy, FetchScheduler, SchedulerStats};
pub use similarity::{meets_threshold, similarity};
pub use strategy::{strategy_for, ExhaustiveSearch, GreedySearch, SearchContext, SearchStrategy};
pub use subsets::{enumerate_candidates, SubsetEnumerator};
pub use throttle::{DomainThrottle, ThrottleDecision, ThrottleStats};
