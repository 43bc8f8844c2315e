use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Terminal failure of an analysis request.
///
/// Stage-local failures with a safe fallback (a single failed batch, a failed
/// consolidation) never reach this type; they are absorbed inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("job title cannot be empty")]
    EmptyJobTitle,

    #[error("job source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("no postings found")]
    NoPostings,

    #[error("no usable descriptions")]
    NoUsableDescriptions,

    #[error("no skills extracted")]
    NoSkillsExtracted,

    #[error("extraction service unavailable: {0}")]
    ExtractorUnavailable(String),

    /// A concurrent run for the same term finished without leaving a cached result.
    #[error("no result available")]
    NoResultAvailable,

    /// The task running the pipeline panicked or was shut down.
    #[error("analysis run aborted: {0}")]
    RunAborted(String),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Analysis(err) => {
                let (status, code) = match err {
                    AnalysisError::EmptyJobTitle => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    AnalysisError::SourceUnavailable(_) => {
                        (StatusCode::BAD_GATEWAY, "SOURCE_UNAVAILABLE")
                    }
                    AnalysisError::NoPostings | AnalysisError::NoUsableDescriptions => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "NO_POSTINGS")
                    }
                    AnalysisError::NoSkillsExtracted => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_EXHAUSTED")
                    }
                    AnalysisError::ExtractorUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "EXTRACTION_UNAVAILABLE")
                    }
                    AnalysisError::NoResultAvailable => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "NO_RESULT")
                    }
                    AnalysisError::RunAborted(reason) => {
                        tracing::error!("Analysis run aborted: {reason}");
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "INTERNAL_ERROR",
                            "An internal server error occurred".to_string(),
                        );
                    }
                };
                (status, code, err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
