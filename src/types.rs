//! Core types for the urlmin system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::analysis::similarity::meets_threshold;

/// Bitmask identifying a parameter subset: bit `i` is set iff the i-th
/// parameter name of the pattern is included.
pub type SubsetMask = u64;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by a renderer or while classifying a rendered response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("FetchTimeout: no response within {0:?}")]
    Timeout(Duration),
    #[error("FetchError: HTTP status {0}")]
    Status(u16),
    #[error("FetchError: {0}")]
    Transport(String),
}

impl FetchError {
    /// Whether the fetch is worth retrying.
    ///
    /// Timeouts, transport failures, 5xx and 429 are transient; every other
    /// status is a definitive answer from the origin.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status(status) => *status >= 500 || *status == 429,
        }
    }
}

/// Per-URL fatal errors. Each one turns into a `failed` [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("MalformedURL: {0}")]
    MalformedUrl(String),
    #[error("TooManyParameters: {count} parameters exceeds the limit of {limit}")]
    TooManyParameters { count: usize, limit: usize },
    #[error("BaselineUnavailable: {0}")]
    BaselineUnavailable(FetchError),
    #[error("DeadlineExceeded: analysis did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

// ============================================================================
// Parameter subsets and candidates
// ============================================================================

/// A subset of a pattern's parameters with the values observed in the original URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSubset {
    /// Indicator mask over the pattern's parameter names
    pub mask: SubsetMask,
    /// Included names in pattern order
    pub names: Vec<String>,
    /// Concrete query pairs, in pattern order, repeated names included
    pub pairs: Vec<(String, String)>,
}

impl ParameterSubset {
    /// Number of parameter names in the subset
    pub fn cardinality(&self) -> u32 {
        self.mask.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }
}

/// One subset to be tested against the baseline.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in indicator order; smaller index means a better candidate
    pub index: usize,
    pub subset: ParameterSubset,
    /// URL carrying exactly the subset's parameters
    pub test_url: Url,
}

/// Raw result of fetching and normalizing one candidate.
///
/// A retried attempt replaces the previous outcome for the same candidate.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub index: usize,
    pub normalized_text: Option<String>,
    pub http_status: Option<u16>,
    pub error: Option<FetchError>,
    /// Number of render attempts made so far
    pub attempts: u32,
}

impl FetchOutcome {
    /// Reduce to a score, dropping the rendered text.
    pub fn score(self, similarity: Option<f64>) -> CandidateScore {
        CandidateScore {
            index: self.index,
            similarity,
            http_status: self.http_status,
            error: self.error,
            attempts: self.attempts,
        }
    }
}

/// Comparison result for one candidate, as consumed by the decision engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub index: usize,
    pub similarity: Option<f64>,
    pub http_status: Option<u16>,
    pub error: Option<FetchError>,
    pub attempts: u32,
}

impl CandidateScore {
    /// A candidate satisfies the threshold only if it rendered successfully.
    pub fn satisfies(&self, threshold: f64) -> bool {
        self.error.is_none()
            && self.http_status.is_some_and(|s| (200..300).contains(&s))
            && self.similarity.is_some_and(|s| meets_threshold(s, threshold))
    }
}

// ============================================================================
// Public result record
// ============================================================================

/// Final status of a URL analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The public record emitted once per analyzed URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub original_url: String,
    /// Shortest equivalent URL, or the original URL on failure
    pub minimal_url: String,
    /// Parameter names that must be kept, in original order
    pub required_params: Vec<String>,
    /// Every parameter of the original URL with its first observed value
    pub all_params: BTreeMap<String, String>,
    /// Similarity between the minimal URL's content and the baseline
    pub similarity_score: f64,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }

    /// Compare two results ignoring when they were produced.
    pub fn same_outcome(&self, other: &AnalysisResult) -> bool {
        self.original_url == other.original_url
            && self.minimal_url == other.minimal_url
            && self.required_params == other.required_params
            && self.all_params == other.all_params
            && self.similarity_score == other.similarity_score
            && self.status == other.status
            && self.error_message == other.error_message
    }
}
