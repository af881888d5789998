//! CLI command implementations

mod analyze;
mod export;
mod group;
mod init;
mod serve;

pub use analyze::analyze_urls;
pub use export::export_results;
pub use group::group_urls;
pub use init::init_config;
pub use serve::serve;

use anyhow::{Context, Result};
use std::sync::Arc;
use urlmin::{
    analysis::{Analyzer, ContentNormalizer, HttpRenderer},
    config::{AnalysisConfig, Config},
    store::open_store,
};

/// Wire renderer, normalizer and store into an analyzer.
fn build_analyzer(config: &Config, analysis: AnalysisConfig) -> Result<Analyzer> {
    let renderer = HttpRenderer::new(config.renderer.clone()).context("Failed to create HTTP renderer")?;
    let store = open_store(&config.store)?;

    Ok(Analyzer::new(
        analysis,
        Arc::new(renderer),
        ContentNormalizer::new(&config.normalizer),
        store,
    ))
}
