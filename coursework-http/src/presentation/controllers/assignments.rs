//! Assignment and submission-upload handlers

use axum::{
    Json,
    extract::{
        Multipart, Query, State, multipart::MultipartRejection, rejection::QueryRejection,
    },
    http::StatusCode,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use coursework_core::domain::access::AccessError;
use coursework_core::domain::auth::{UserId, UserRole};
use coursework_core::domain::catalog::{AssignmentChanges, NewAssignment, NewSubmission};

use crate::presentation::auth::{AuthUser, JsonBody, RecordId};
use crate::presentation::errors::ApiError;
use crate::presentation::models::{
    AssignmentResponse, IdResponse, PageQuery, SubmissionPage, total_pages,
};
use crate::presentation::state::AppState;

fn assignment_not_found() -> ApiError {
    ApiError::not_found("Assignment not found")
}

/// `POST /assignments`
pub async fn create_assignment(
    State(state): State<AppState>,
    JsonBody(assignment): JsonBody<NewAssignment>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let assignment = state.catalog.create_assignment(assignment).await?;
    info!(
        assignment_id = assignment.id,
        course_id = assignment.course_id,
        "Assignment created"
    );

    Ok((StatusCode::CREATED, Json(IdResponse { id: assignment.id })))
}

/// `GET /assignments/{id}`
pub async fn get_assignment(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = state
        .catalog
        .find_assignment_by_id(id)
        .await?
        .ok_or_else(assignment_not_found)?;

    Ok(Json(assignment.into()))
}

/// `PATCH /assignments/{id}`
pub async fn update_assignment(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(changes): JsonBody<AssignmentChanges>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .update_assignment(id, changes)
        .await?
        .ok_or_else(assignment_not_found)?;

    Ok(StatusCode::OK)
}

/// `DELETE /assignments/{id}`
pub async fn delete_assignment(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ApiError> {
    if !state.catalog.delete_assignment(id).await? {
        return Err(assignment_not_found());
    }

    info!(assignment_id = id, "Assignment deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /assignments/{id}/submissions?page=&numPerPage=`
pub async fn list_submissions(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<SubmissionPage>, ApiError> {
    state
        .catalog
        .find_assignment_by_id(id)
        .await?
        .ok_or_else(assignment_not_found)?;

    let query = query.map(|Query(query)| query).unwrap_or_default();
    let page_number = query.page_number();
    let page_size = query.page_size(state.config.pagination.submissions_per_page);

    let total_count = state.catalog.count_submissions(id).await?;
    let offset = (page_number - 1).saturating_mul(page_size);
    let media_path = state.config.uploads.media_path.trim_end_matches('/');

    let submissions = state
        .catalog
        .list_submissions(id, offset, page_size)
        .await?
        .into_iter()
        .map(|mut submission| {
            submission.file = format!("{}/{}", media_path, submission.file);
            submission
        })
        .collect();

    Ok(Json(SubmissionPage {
        submissions,
        page_number,
        total_pages: total_pages(total_count, page_size),
        page_size,
        total_count,
    }))
}

/// Raw multipart fields of a submission upload
#[derive(Debug, Default)]
struct SubmissionForm {
    file: Option<(String, Bytes)>,
    assignment_id: Option<String>,
    student_id: Option<String>,
    timestamp: Option<String>,
}

async fn read_submission_form(mut multipart: Multipart) -> Result<SubmissionForm, ApiError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                form.file = Some((file_name, bytes));
            }
            "assignmentId" | "studentId" | "timestamp" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match name.as_str() {
                    "assignmentId" => form.assignment_id = value,
                    "studentId" => form.student_id = value,
                    _ => form.timestamp = value,
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Validated submission metadata
struct SubmissionFields {
    assignment_id: i64,
    student_id: UserId,
    timestamp: DateTime<Utc>,
}

fn parse_submission_fields(form: &SubmissionForm) -> Result<SubmissionFields, ApiError> {
    let malformed = || ApiError::bad_request("Malformed body.");

    let (Some(assignment_id), Some(student_id), Some(timestamp)) =
        (&form.assignment_id, &form.student_id, &form.timestamp)
    else {
        return Err(malformed());
    };

    Ok(SubmissionFields {
        assignment_id: assignment_id.parse().map_err(|_| malformed())?,
        student_id: student_id.parse().map_err(|_| malformed())?,
        timestamp: DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| malformed())?
            .with_timezone(&Utc),
    })
}

/// `POST /assignments/{id}/submissions` (multipart)
///
/// Expects a `file` part plus `assignmentId`, `studentId` and `timestamp`
/// text parts. Only admins may submit on behalf of another student, and the
/// student must be enrolled in the assignment's course.
pub async fn create_submission(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    RecordId(id): RecordId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let form = match multipart {
        Ok(multipart) => read_submission_form(multipart).await?,
        Err(rejection) => {
            debug!(error = %rejection, "Submission upload is not multipart");
            SubmissionForm::default()
        }
    };

    let Some((file_name, bytes)) = form.file.clone() else {
        return Err(ApiError::bad_request("No attached file."));
    };

    let fields = parse_submission_fields(&form)?;

    if fields.assignment_id != id {
        return Err(ApiError::bad_request("Assignment IDs do not match."));
    }

    if !identity.is_admin() && identity.subject_id != fields.student_id {
        debug!(
            subject = %identity.subject_id,
            student_id = %fields.student_id,
            "Submission for a different student"
        );
        return Err(AccessError::Forbidden.into());
    }

    let assignment = state
        .catalog
        .find_assignment_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment not found."))?;

    match state.catalog.find_user_by_id(fields.student_id).await? {
        Some(user) if user.role == UserRole::Student => {}
        _ => return Err(ApiError::bad_request("Associated student is invalid.")),
    }

    if !state
        .catalog
        .is_enrolled(assignment.course_id, fields.student_id)
        .await?
    {
        return Err(ApiError::bad_request(
            "Associated student is not enrolled in this course",
        ));
    }

    let reference = state.files.store(&file_name, bytes).await?;
    let submission = state
        .catalog
        .create_submission(NewSubmission {
            assignment_id: id,
            student_id: fields.student_id,
            timestamp: fields.timestamp,
            file: reference,
        })
        .await?;

    info!(
        submission_id = submission.id,
        assignment_id = id,
        student_id = %submission.student_id,
        "Submission stored"
    );

    Ok((StatusCode::CREATED, Json(IdResponse { id: submission.id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(assignment_id: &str, student_id: &str, timestamp: &str) -> SubmissionForm {
        SubmissionForm {
            file: None,
            assignment_id: Some(assignment_id.to_string()),
            student_id: Some(student_id.to_string()),
            timestamp: Some(timestamp.to_string()),
        }
    }

    #[test]
    fn test_parse_submission_fields() {
        let fields = parse_submission_fields(&form("3", "9", "2024-03-01T12:00:00Z")).unwrap();
        assert_eq!(fields.assignment_id, 3);
        assert_eq!(fields.student_id, UserId(9));
        assert_eq!(fields.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_parse_submission_fields_rejects_bad_values() {
        assert!(parse_submission_fields(&form("x", "9", "2024-03-01T12:00:00Z")).is_err());
        assert!(parse_submission_fields(&form("3", "9", "yesterday")).is_err());
        assert!(parse_submission_fields(&SubmissionForm::default()).is_err());
    }
}
