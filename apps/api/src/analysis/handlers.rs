use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::analysis::service::StatusReport;
use crate::errors::AppError;
use crate::models::analysis::AnalysisResult;
use crate::state::AppState;

/// Longer titles are rejected before they reach the job source.
const MAX_JOB_TITLE_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub job_title: String,
}

/// POST /api/v1/analysis
pub async fn handle_request_analysis(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    if req.job_title.chars().count() > MAX_JOB_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "job_title must be at most {MAX_JOB_TITLE_CHARS} characters"
        )));
    }

    let result = state.analysis.request_analysis(&req.job_title).await?;
    Ok(Json(result))
}

/// GET /api/v1/analysis/status
pub async fn handle_analysis_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.analysis.probe_health().await)
}

/// DELETE /api/v1/cache
pub async fn handle_flush_cache(State(state): State<AppState>) -> StatusCode {
    state.analysis.flush_cache();
    StatusCode::NO_CONTENT
}
