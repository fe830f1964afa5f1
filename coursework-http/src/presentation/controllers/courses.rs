//! Course, enrollment and roster handlers

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use coursework_core::domain::auth::{UserId, UserRole};
use coursework_core::domain::catalog::{Course, CourseChanges, NewCourse};

use crate::presentation::auth::{JsonBody, RecordId};
use crate::presentation::errors::ApiError;
use crate::presentation::models::{
    AssignmentIdsResponse, CoursePage, CourseSummary, EnrollmentRequest, IdResponse, PageQuery,
    total_pages,
};
use crate::presentation::state::AppState;

fn course_not_found() -> ApiError {
    ApiError::not_found("Course not found")
}

async fn existing_course(state: &AppState, id: i64) -> Result<Course, ApiError> {
    state
        .catalog
        .find_course_by_id(id)
        .await?
        .ok_or_else(course_not_found)
}

async fn ensure_instructor(state: &AppState, id: UserId) -> Result<(), ApiError> {
    match state.catalog.find_user_by_id(id).await? {
        Some(user) if user.role == UserRole::Instructor => Ok(()),
        _ => Err(ApiError::bad_request(
            "Instructor ID does not exist or the user is not an instructor.",
        )),
    }
}

/// `GET /courses?page=`
pub async fn list_courses(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<CoursePage>, ApiError> {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let page_size = state.config.pagination.courses_per_page;
    let page_number = query.page_number();

    let total_count = state.catalog.count_courses().await?;
    let offset = (page_number - 1).saturating_mul(page_size);
    let courses = state.catalog.list_courses(offset, page_size).await?;

    Ok(Json(CoursePage {
        courses,
        page_number,
        total_pages: total_pages(total_count, page_size),
        page_size,
        total_count,
    }))
}

/// `GET /courses/{id}`
pub async fn get_course(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<CourseSummary>, ApiError> {
    let course = existing_course(&state, id).await?;
    Ok(Json(course.into()))
}

/// `POST /courses`
pub async fn create_course(
    State(state): State<AppState>,
    JsonBody(course): JsonBody<NewCourse>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    ensure_instructor(&state, course.instructor_id).await?;

    let course = state.catalog.create_course(course).await?;
    info!(course_id = course.id, instructor_id = %course.instructor_id, "Course created");

    Ok((StatusCode::CREATED, Json(IdResponse { id: course.id })))
}

/// `PATCH /courses/{id}`
pub async fn update_course(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(changes): JsonBody<CourseChanges>,
) -> Result<StatusCode, ApiError> {
    if let Some(instructor_id) = changes.instructor_id {
        ensure_instructor(&state, instructor_id).await?;
    }

    state
        .catalog
        .update_course(id, changes)
        .await?
        .ok_or_else(course_not_found)?;

    Ok(StatusCode::OK)
}

/// `DELETE /courses/{id}`
pub async fn delete_course(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ApiError> {
    if !state.catalog.delete_course(id).await? {
        return Err(course_not_found());
    }

    info!(course_id = id, "Course deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /courses/{id}/students`
pub async fn list_students(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Vec<UserId>>, ApiError> {
    existing_course(&state, id).await?;
    Ok(Json(state.catalog.enrolled_students(id).await?))
}

/// `POST /courses/{id}/students`
pub async fn update_enrollment(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(request): JsonBody<EnrollmentRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .update_enrollment(id, &request.add, &request.remove)
        .await?;

    info!(
        course_id = id,
        added = request.add.len(),
        removed = request.remove.len(),
        "Enrollment updated"
    );
    Ok(StatusCode::OK)
}

/// `GET /courses/{id}/roster` as `text/csv`
pub async fn roster(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<impl IntoResponse, ApiError> {
    existing_course(&state, id).await?;

    let mut csv = String::new();
    for student_id in state.catalog.enrolled_students(id).await? {
        if let Some(student) = state.catalog.find_user_by_id(student_id).await? {
            csv.push_str(&roster_row(student.id, &student.name, &student.email));
        }
    }

    let disposition = format!("attachment; filename=\"roster-{}.csv\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

fn roster_row(id: UserId, name: &str, email: &str) -> String {
    format!("{},\"{}\",{}\n", id, name.replace('"', "\"\""), email)
}

/// `GET /courses/{id}/assignments`
pub async fn list_assignments(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<AssignmentIdsResponse>, ApiError> {
    existing_course(&state, id).await?;
    Ok(Json(AssignmentIdsResponse {
        assignments: state.catalog.assignments_for_course(id).await?,
    }))
}
