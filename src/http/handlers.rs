//! HTTP API Request Handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{debug, error};

use super::types::*;
use crate::analysis::Analyzer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub max_batch_size: usize,
}

/// Root endpoint
pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "urlmin: minimal query parameter discovery. POST /analyze or /analyze-batch.".to_string(),
    })
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Analyze a single URL
pub async fn analyze(State(state): State<AppState>, Json(request): Json<AnalyzeRequest>) -> impl IntoResponse {
    debug!("HTTP analyze request: url={}", request.url);

    match state.analyzer.analyze_with(&request.url, &request.options()).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ErrorResponse::invalid_options(e.0))).into_response(),
    }
}

/// Analyze a batch of URLs
pub async fn analyze_batch(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeBatchRequest>,
) -> impl IntoResponse {
    if request.urls.len() > state.max_batch_size {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "BATCH_TOO_LARGE",
                format!(
                    "Batch of {} URLs exceeds the maximum of {}",
                    request.urls.len(),
                    state.max_batch_size
                ),
            )),
        )
            .into_response();
    }

    debug!("HTTP batch request: {} URLs", request.urls.len());

    match state.analyzer.analyze_batch_with(&request.urls, &request.options()).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ErrorResponse::invalid_options(e.0))).into_response(),
    }
}

/// Every stored result
pub async fn results(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.store().export_all() {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => {
            error!("Failed to export results: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            )
                .into_response()
        }
    }
}
