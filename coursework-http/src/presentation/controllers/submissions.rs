//! Submission grading

use axum::{extract::State, http::StatusCode};
use tracing::info;

use crate::presentation::auth::{JsonBody, RecordId};
use crate::presentation::errors::ApiError;
use crate::presentation::models::GradeRequest;
use crate::presentation::state::AppState;

/// `PATCH /submissions/{id}`; only `grade` is written, and only when present
pub async fn grade_submission(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(request): JsonBody<GradeRequest>,
) -> Result<StatusCode, ApiError> {
    let submission = match request.grade {
        Some(grade) => state.catalog.grade_submission(id, grade).await?,
        None => state.catalog.find_submission_by_id(id).await?,
    }
    .ok_or_else(|| ApiError::not_found("Submission not found"))?;

    info!(submission_id = submission.id, grade = ?submission.grade, "Submission graded");
    Ok(StatusCode::OK)
}
