//! Batch orchestration
//!
//! The [`Analyzer`] creates one [`FetchScheduler`] per batch, runs every URL
//! of the batch concurrently through its own decision state machine and
//! returns exactly one result per input, in input order.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AnalysisConfig, AnalysisOptions};
use crate::store::ResultStore;
use crate::types::{AnalysisError, AnalysisResult};

use super::assembler::ResultAssembler;
use super::decision::{CandidateTally, Decision, DecisionEngine, TallyLedger};
use super::normalizer::ContentNormalizer;
use super::pattern::UrlPattern;
use super::renderer::Renderer;
use super::scheduler::FetchScheduler;
use super::strategy::{strategy_for, SearchContext, SearchStrategy};

/// Per-call options that failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("InvalidOptions: {0}")]
pub struct InvalidOptions(pub String);

/// Entry point of the discovery engine
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    renderer: Arc<dyn Renderer>,
    normalizer: Arc<ContentNormalizer>,
    assembler: ResultAssembler,
}

impl Analyzer {
    pub fn new(
        config: AnalysisConfig,
        renderer: Arc<dyn Renderer>,
        normalizer: ContentNormalizer,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            config,
            renderer,
            normalizer: Arc::new(normalizer),
            assembler: ResultAssembler::new(store),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        self.assembler.store()
    }

    /// Analyze one URL with the configured defaults.
    pub async fn analyze(&self, url: &str) -> AnalysisResult {
        let scheduler = self.scheduler(&self.config);
        let strategy = strategy_for(self.config.strategy);
        self.analyze_url(&self.config, &scheduler, strategy.as_ref(), url).await
    }

    /// Analyze one URL with per-call overrides.
    pub async fn analyze_with(&self, url: &str, options: &AnalysisOptions) -> Result<AnalysisResult, InvalidOptions> {
        let config = self.config.with_options(options).map_err(InvalidOptions)?;
        let scheduler = self.scheduler(&config);
        let strategy = strategy_for(config.strategy);
        Ok(self.analyze_url(&config, &scheduler, strategy.as_ref(), url).await)
    }

    /// Analyze a batch with the configured defaults.
    pub async fn analyze_batch(&self, urls: &[String]) -> Vec<AnalysisResult> {
        self.run_batch(&self.config, urls).await
    }

    /// Analyze a batch with per-call overrides.
    pub async fn analyze_batch_with(
        &self,
        urls: &[String],
        options: &AnalysisOptions,
    ) -> Result<Vec<AnalysisResult>, InvalidOptions> {
        let config = self.config.with_options(options).map_err(InvalidOptions)?;
        Ok(self.run_batch(&config, urls).await)
    }

    fn scheduler(&self, config: &AnalysisConfig) -> FetchScheduler {
        FetchScheduler::new(Arc::clone(&self.renderer), Arc::clone(&self.normalizer), config)
    }

    async fn run_batch(&self, config: &AnalysisConfig, urls: &[String]) -> Vec<AnalysisResult> {
        let start = Instant::now();
        let scheduler = self.scheduler(config);
        let strategy = strategy_for(config.strategy);

        tracing::info!(
            "Analyzing {} URLs ({} strategy, threshold {}, renderer {})",
            urls.len(),
            strategy.name(),
            config.similarity_threshold,
            self.renderer.name()
        );

        let results = join_all(
            urls.iter()
                .map(|url| self.analyze_url(config, &scheduler, strategy.as_ref(), url)),
        )
        .await;

        let stats = scheduler.stats();
        tracing::info!(
            "Batch of {} finished in {:?}: {} renders, {} retries, {} failed fetches, {} cancelled",
            urls.len(),
            start.elapsed(),
            stats.renders,
            stats.retries,
            stats.failures,
            stats.cancelled
        );

        results
    }

    async fn analyze_url(
        &self,
        config: &AnalysisConfig,
        scheduler: &FetchScheduler,
        strategy: &dyn SearchStrategy,
        input: &str,
    ) -> AnalysisResult {
        let pattern = match UrlPattern::parse(input) {
            Ok(pattern) => pattern,
            Err(e) => return self.assembler.reject(input, &e),
        };

        if pattern.is_empty() {
            tracing::debug!("{} has no query parameters", input);
            return self
                .assembler
                .assemble(input, &pattern, Decision::full_set(CandidateTally::default()));
        }

        if pattern.len() > config.max_parameter_count {
            let error = AnalysisError::TooManyParameters {
                count: pattern.len(),
                limit: config.max_parameter_count,
            };
            return self
                .assembler
                .assemble(input, &pattern, Decision::failed(error, CandidateTally::default()));
        }

        let decision = Self::decide(config, scheduler, strategy, &pattern).await;
        self.assembler.assemble(input, &pattern, decision)
    }

    /// Search under the per-URL deadline.
    ///
    /// On expiry the search is dropped; its ledger still holds what was
    /// scored, with outstanding candidates counted as cancelled.
    async fn decide(
        config: &AnalysisConfig,
        scheduler: &FetchScheduler,
        strategy: &dyn SearchStrategy,
        pattern: &UrlPattern,
    ) -> Decision {
        let ledger = TallyLedger::default();
        let search = Self::search(config, scheduler, strategy, pattern, ledger.clone());

        match config.url_deadline() {
            Some(deadline) => match tokio::time::timeout(deadline, search).await {
                Ok(decision) => decision,
                Err(_) => {
                    tracing::warn!("{} exceeded its deadline of {:?}", pattern.original(), deadline);
                    Decision::failed(AnalysisError::DeadlineExceeded(deadline), ledger.snapshot())
                }
            },
            None => search.await,
        }
    }

    async fn search(
        config: &AnalysisConfig,
        scheduler: &FetchScheduler,
        strategy: &dyn SearchStrategy,
        pattern: &UrlPattern,
        ledger: TallyLedger,
    ) -> Decision {
        let mut engine = DecisionEngine::new(config.similarity_threshold).with_ledger(ledger);

        let baseline = match scheduler.fetch_baseline(pattern.domain(), pattern.original()).await {
            Ok(baseline) => baseline,
            Err(e) => return engine.fail(AnalysisError::BaselineUnavailable(e)),
        };
        engine.baseline_ready();

        let ctx = SearchContext {
            pattern,
            scheduler,
            baseline,
            include_empty: config.probe_bare_url,
        };
        strategy.search(ctx, engine).await
    }
}
