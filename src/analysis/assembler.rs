//! Result assembly
//!
//! Turns a [`Decision`] into the public [`AnalysisResult`] and hands it to
//! the result store.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::store::ResultStore;
use crate::types::{AnalysisError, AnalysisResult, AnalysisStatus};

use super::decision::{Decision, DecisionOutcome};
use super::pattern::UrlPattern;

/// Packages decisions and forwards them to the store
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    store: Arc<dyn ResultStore>,
}

impl ResultAssembler {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Build the result for `input`, a URL that was parsed into `pattern`.
    pub fn assemble(&self, input: &str, pattern: &UrlPattern, decision: Decision) -> AnalysisResult {
        let original_url = input.to_string();
        let all_params = pattern.all_params();
        let tally = decision.tally;

        let result = match decision.outcome {
            DecisionOutcome::Minimal { mask, similarity } if mask != pattern.full_mask() => {
                let subset = pattern.subset(mask);
                let minimal_url = pattern.build_url(&subset).to_string();
                AnalysisResult {
                    original_url,
                    minimal_url,
                    required_params: subset.names,
                    all_params,
                    similarity_score: similarity,
                    status: AnalysisStatus::Success,
                    error_message: None,
                    timestamp: Utc::now(),
                }
            }
            DecisionOutcome::Minimal { similarity, .. } => AnalysisResult {
                minimal_url: original_url.clone(),
                original_url,
                required_params: pattern.param_names(),
                all_params,
                similarity_score: similarity,
                status: AnalysisStatus::Success,
                error_message: None,
                timestamp: Utc::now(),
            },
            DecisionOutcome::FullSet => AnalysisResult {
                minimal_url: original_url.clone(),
                original_url,
                required_params: pattern.param_names(),
                all_params,
                similarity_score: 1.0,
                status: AnalysisStatus::Success,
                error_message: None,
                timestamp: Utc::now(),
            },
            DecisionOutcome::Failed(error) => Self::failure(original_url, all_params, &error),
        };

        tracing::info!(
            "{} -> {} [{}] (candidates: {} total, {} scored, {} matched, {} failed, {} cancelled)",
            result.original_url,
            result.minimal_url,
            result.status,
            tally.total,
            tally.scored,
            tally.matched,
            tally.failed,
            tally.cancelled
        );

        self.emit(result)
    }

    /// Build the result for an input that never produced a pattern.
    pub fn reject(&self, input: &str, error: &AnalysisError) -> AnalysisResult {
        tracing::warn!("Rejected {:?}: {}", input, error);
        self.emit(Self::failure(input.to_string(), BTreeMap::new(), error))
    }

    fn failure(original_url: String, all_params: BTreeMap<String, String>, error: &AnalysisError) -> AnalysisResult {
        AnalysisResult {
            minimal_url: original_url.clone(),
            original_url,
            required_params: Vec::new(),
            all_params,
            similarity_score: 0.0,
            status: AnalysisStatus::Failed,
            error_message: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Append to the store. A store failure never changes the result.
    fn emit(&self, result: AnalysisResult) -> AnalysisResult {
        if let Err(e) = self.store.append(&result) {
            tracing::error!("Failed to store result for {}: {:#}", result.original_url, e);
        }
        result
    }
}
