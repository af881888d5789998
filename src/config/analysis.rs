//! Analysis engine configuration and per-call overrides

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Largest parameter count a subset mask can represent
pub const MAX_REPRESENTABLE_PARAMETERS: usize = 63;

/// How the subset lattice is searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategyKind {
    /// Test every non-empty subset; guarantees minimal cardinality
    #[default]
    Exhaustive,
    /// Drop one parameter at a time while similarity holds; linear in n
    Greedy,
}

impl SearchStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhaustive => "exhaustive",
            Self::Greedy => "greedy",
        }
    }
}

impl fmt::Display for SearchStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exhaustive" => Ok(Self::Exhaustive),
            "greedy" => Ok(Self::Greedy),
            other => Err(format!("unknown search strategy '{}'", other)),
        }
    }
}

/// Minimal-parameter discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Similarity a candidate must reach to count as equivalent (0.0 exclusive - 1.0).
    ///
    /// The most sensitive knob in the system: too high and URLs are reported as
    /// not minimizable, too low and content-bearing parameters get dropped.
    pub similarity_threshold: f64,
    /// Maximum fetches in flight across a whole batch
    pub max_concurrency: usize,
    /// Requests per minute allowed against a single domain
    pub max_requests_per_domain: u32,
    /// Requests a domain may receive back to back before the rate applies
    pub domain_burst: u32,
    /// Timeout for one render call (milliseconds)
    pub request_timeout_ms: u64,
    /// Retries after a transient fetch failure
    pub max_request_retries: u32,
    /// Base delay before a retried task is re-queued (milliseconds, doubles per attempt)
    pub retry_backoff_ms: u64,
    /// Parameter count above which a URL fails with `TooManyParameters`
    pub max_parameter_count: usize,
    /// Overall deadline for one URL in seconds (0 disables)
    pub url_deadline_secs: u64,
    /// Also test the bare path with no parameters at all
    pub probe_bare_url: bool,
    /// Search strategy over parameter subsets
    pub strategy: SearchStrategyKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            max_concurrency: 5,
            max_requests_per_domain: 120,
            domain_burst: 5,
            request_timeout_ms: 30_000,
            max_request_retries: 3,
            retry_backoff_ms: 500,
            max_parameter_count: 20,
            url_deadline_secs: 300,
            probe_bare_url: false,
            strategy: SearchStrategyKind::Exhaustive,
        }
    }
}

impl AnalysisConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn url_deadline(&self) -> Option<Duration> {
        (self.url_deadline_secs > 0).then(|| Duration::from_secs(self.url_deadline_secs))
    }

    /// Append every violated constraint to `errors`.
    pub fn collect_errors(&self, errors: &mut Vec<String>) {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            errors.push("similarity_threshold must be in (0.0, 1.0]".to_string());
        }
        if self.max_concurrency == 0 {
            errors.push("max_concurrency must be at least 1".to_string());
        }
        if self.max_requests_per_domain == 0 {
            errors.push("max_requests_per_domain must be at least 1".to_string());
        }
        if self.domain_burst == 0 {
            errors.push("domain_burst must be at least 1".to_string());
        }
        if self.request_timeout_ms == 0 {
            errors.push("request_timeout_ms must be positive".to_string());
        }
        if self.max_parameter_count == 0 || self.max_parameter_count > MAX_REPRESENTABLE_PARAMETERS {
            errors.push(format!(
                "max_parameter_count must be between 1 and {}",
                MAX_REPRESENTABLE_PARAMETERS
            ));
        }
    }

    /// Apply per-call overrides, validating the merged configuration.
    pub fn with_options(&self, options: &AnalysisOptions) -> Result<Self, String> {
        let mut merged = self.clone();
        if let Some(threshold) = options.similarity_threshold {
            merged.similarity_threshold = threshold;
        }
        if let Some(timeout_ms) = options.timeout_ms {
            merged.request_timeout_ms = timeout_ms;
        }
        if let Some(strategy) = options.strategy {
            merged.strategy = strategy;
        }

        let mut errors = Vec::new();
        merged.collect_errors(&mut errors);
        if errors.is_empty() {
            Ok(merged)
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Per-call overrides for a single analysis request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub strategy: Option<SearchStrategyKind>,
}
