//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::config::{AnalysisOptions, SearchStrategyKind};

/// Single URL analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// URL to minimize
    pub url: String,
    /// Per-fetch timeout override (milliseconds)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Similarity threshold override
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    /// Search strategy override
    #[serde(default)]
    pub strategy: Option<SearchStrategyKind>,
}

impl AnalyzeRequest {
    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            similarity_threshold: self.similarity_threshold,
            timeout_ms: self.timeout_ms,
            strategy: self.strategy,
        }
    }
}

/// Batch analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeBatchRequest {
    /// URLs to minimize; results come back in the same order
    pub urls: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub strategy: Option<SearchStrategyKind>,
}

impl AnalyzeBatchRequest {
    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            similarity_threshold: self.similarity_threshold,
            timeout_ms: self.timeout_ms,
            strategy: self.strategy,
        }
    }
}

/// Root endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" while the server answers
    pub status: String,
    /// Service version
    pub version: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::new("INVALID_OPTIONS", message)
    }
}
