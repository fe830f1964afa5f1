//! Route definitions and server setup
//!
//! Each route spells out its own gate chain. Layers wrap from the inside out,
//! so the last layer applied runs first:
//!
//! ```text
//! protected(owned_by(with_body(patch(handler)), rule), &state)
//!   = authenticate -> rate limit -> ownership -> body -> handler
//! ```

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, Uri, header},
    middleware,
    routing::{MethodRouter, delete, get, patch, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use coursework_core::config::ServerConfig;
use coursework_core::domain::access::{KeySource, OwnerField, OwnershipRule};
use coursework_core::domain::auth::UserRole;
use coursework_core::domain::catalog::RecordKind;

use crate::presentation::{
    controllers::{assignments, courses, health, media, submissions, users},
    errors::ApiError,
    middleware::{
        OwnershipCheck, RequiredFields, authenticate, logging_middleware, optional_authenticate,
        rate_limit_middleware, require_body, require_fields, require_owner, require_role,
    },
    state::AppState,
};

const NEW_USER_FIELDS: &[&str] = &["name", "email", "password"];
const NEW_COURSE_FIELDS: &[&str] = &["subject", "number", "title", "term", "instructorId"];
const NEW_ASSIGNMENT_FIELDS: &[&str] = &["courseId", "title", "points", "due"];

/// `/users/{id}`: the user themself
fn user_rule() -> OwnershipRule {
    OwnershipRule::new(
        RecordKind::User,
        KeySource::path("id"),
        OwnerField::new(["id"]),
    )
}

/// `/courses/{id}/...`: the course's instructor
fn course_rule() -> OwnershipRule {
    OwnershipRule::new(
        RecordKind::Course,
        KeySource::path("id"),
        OwnerField::new(["instructorId"]),
    )
}

/// `POST /assignments`: the instructor of the course named in the body
fn new_assignment_rule() -> OwnershipRule {
    OwnershipRule::new(
        RecordKind::Course,
        KeySource::body("courseId"),
        OwnerField::new(["instructorId"]),
    )
}

/// `/assignments/{id}/...`: the instructor of the assignment's course
fn assignment_rule() -> OwnershipRule {
    OwnershipRule::new(
        RecordKind::Assignment,
        KeySource::path("id"),
        OwnerField::new(["course", "instructorId"]),
    )
    .through([RecordKind::Course])
}

/// `/submissions/{id}`: the instructor of the submission's course
fn submission_rule() -> OwnershipRule {
    OwnershipRule::new(
        RecordKind::Submission,
        KeySource::path("id"),
        OwnerField::new(["assignment", "course", "instructorId"]),
    )
    .through([RecordKind::Assignment, RecordKind::Course])
}

/// Authenticate, then rate limit on the caller's user bucket
fn protected(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    route
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

/// Rate limit on the caller's address bucket
fn anonymous(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit_middleware,
    ))
}

fn owned_by(
    route: MethodRouter<AppState>,
    rule: OwnershipRule,
    state: &AppState,
) -> MethodRouter<AppState> {
    let check = OwnershipCheck::new(state.ownership.clone(), rule);
    route.layer(middleware::from_fn_with_state(check, require_owner))
}

fn admin_only(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn_with_state(UserRole::Admin, require_role))
}

fn with_body(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn(require_body))
}

fn with_fields(
    route: MethodRouter<AppState>,
    fields: &'static [&'static str],
) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn_with_state(
        RequiredFields(fields),
        require_fields,
    ))
}

async fn resource_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!(
        "Resource does not exist. Requested resource: {}",
        uri
    ))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let allow_origin = if server.allowed_origins.len() == 1 && server.allowed_origins[0] == "*" {
        tracing::debug!("CORS: Using wildcard origin (*)");
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = server
            .allowed_origins
            .iter()
            .filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| {
                        tracing::warn!(origin, "Invalid CORS origin in config; skipping");
                    })
                    .ok()
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([
            header::RETRY_AFTER,
            header::HeaderName::from_static("x-ratelimit-limit"),
            header::HeaderName::from_static("x-ratelimit-remaining"),
        ])
        .max_age(Duration::from_secs(3600))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let create = with_fields(post(users::create_user), NEW_USER_FIELDS)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_authenticate,
        ));

    Router::new()
        .route("/users", create)
        .route("/users/login", anonymous(post(users::login), state))
        .route(
            "/users/{id}",
            protected(owned_by(get(users::get_user), user_rule(), state), state),
        )
}

fn course_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/courses", anonymous(get(courses::list_courses), state))
        .route(
            "/courses",
            protected(
                admin_only(with_fields(post(courses::create_course), NEW_COURSE_FIELDS)),
                state,
            ),
        )
        .route("/courses/{id}", anonymous(get(courses::get_course), state))
        .route(
            "/courses/{id}",
            protected(
                owned_by(with_body(patch(courses::update_course)), course_rule(), state),
                state,
            ),
        )
        .route(
            "/courses/{id}",
            protected(admin_only(delete(courses::delete_course)), state),
        )
        .route(
            "/courses/{id}/students",
            protected(
                owned_by(
                    get(courses::list_students).post(courses::update_enrollment),
                    course_rule(),
                    state,
                ),
                state,
            ),
        )
        .route(
            "/courses/{id}/roster",
            protected(owned_by(get(courses::roster), course_rule(), state), state),
        )
        .route(
            "/courses/{id}/assignments",
            anonymous(get(courses::list_assignments), state),
        )
}

fn assignment_routes(state: &AppState) -> Router<AppState> {
    // Missing fields answer 400 before the body-keyed ownership lookup runs
    let create = protected(
        with_fields(
            owned_by(
                post(assignments::create_assignment),
                new_assignment_rule(),
                state,
            ),
            NEW_ASSIGNMENT_FIELDS,
        ),
        state,
    );

    let upload_limit = DefaultBodyLimit::max(state.config.uploads.max_file_bytes);

    Router::new()
        .route("/assignments", create)
        .route(
            "/assignments/{id}",
            anonymous(get(assignments::get_assignment), state),
        )
        .route(
            "/assignments/{id}",
            protected(
                owned_by(
                    with_body(patch(assignments::update_assignment))
                        .delete(assignments::delete_assignment),
                    assignment_rule(),
                    state,
                ),
                state,
            ),
        )
        .route(
            "/assignments/{id}/submissions",
            protected(
                owned_by(
                    get(assignments::list_submissions),
                    assignment_rule(),
                    state,
                ),
                state,
            ),
        )
        .route(
            "/assignments/{id}/submissions",
            protected(
                post(assignments::create_submission).layer(upload_limit),
                state,
            ),
        )
}

fn submission_routes(state: &AppState) -> Router<AppState> {
    let media_route = format!(
        "{}/{{name}}",
        state.config.uploads.media_path.trim_end_matches('/')
    );

    Router::new()
        .route(
            "/submissions/{id}",
            protected(
                owned_by(
                    with_body(patch(submissions::grade_submission)),
                    submission_rule(),
                    state,
                ),
                state,
            ),
        )
        .route(
            &media_route,
            protected(get(media::get_submission_file), state),
        )
}

/// Create the application router with the full middleware stack
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let service_builder = ServiceBuilder::new()
        // HTTP tracing
        .layer(TraceLayer::new_for_http())
        // CORS handling
        .layer(cors_layer(&config.server))
        // Request timeout
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_seconds),
        ))
        // Custom logging middleware
        .layer(middleware::from_fn(logging_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(user_routes(&state))
        .merge(course_routes(&state))
        .merge(assignment_routes(&state))
        .merge(submission_routes(&state))
        .fallback(resource_not_found)
        .layer(service_builder)
        .with_state(state)
}
