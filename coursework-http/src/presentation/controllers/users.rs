//! User registration, login and profile handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use coursework_core::domain::access::AccessError;
use coursework_core::domain::auth::{AuthError, UserId, UserRole};
use coursework_core::domain::catalog::NewUser;

use crate::presentation::auth::{JsonBody, MaybeAuthUser, RecordId};
use crate::presentation::errors::ApiError;
use crate::presentation::models::{
    CreateUserRequest, IdResponse, LoginRequest, TokenResponse, UserProfileResponse,
};
use crate::presentation::state::AppState;

/// `POST /users`
///
/// Anyone may register a student. Instructor and admin accounts can only be
/// created by an authenticated admin.
pub async fn create_user(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let caller_is_admin = caller.as_ref().is_some_and(|identity| identity.is_admin());
    if request.role != UserRole::Student && !caller_is_admin {
        debug!(role = %request.role, "Refusing privileged account creation");
        return Err(AccessError::Forbidden.into());
    }

    let password_hash = state.password_hasher.hash(request.password).await?;
    let user = state
        .catalog
        .create_user(NewUser {
            name: request.name,
            email: request.email,
            password_hash,
            role: request.role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "User created");

    Ok((
        StatusCode::CREATED,
        Json(IdResponse {
            id: user.id.as_i64(),
        }),
    ))
}

/// `POST /users/login`
pub async fn login(
    State(state): State<AppState>,
    body: Result<JsonBody<LoginRequest>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = body.map(|JsonBody(request)| request).unwrap_or_default();

    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(ApiError::bad_request(
            "Request body must contain 'email' and 'password' fields",
        ));
    };

    let Some(user) = state.catalog.find_user_by_email(&email).await? else {
        debug!("Login for unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !state
        .password_hasher
        .verify(password, user.password_hash.clone())
        .await?
    {
        debug!(user_id = %user.id, "Login with wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.jwt.generate_token(user.id, user.role)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse { token }))
}

/// `GET /users/{id}`
///
/// Students see the courses they are enrolled in, instructors the courses they
/// teach. Admin records are returned as stored, minus the password hash.
pub async fn get_user(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Response, ApiError> {
    let user = state
        .catalog
        .find_user_by_id(UserId(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let courses = match user.role {
        UserRole::Student => state.catalog.courses_for_student(user.id).await?,
        UserRole::Instructor => state.catalog.courses_taught_by(user.id).await?,
        UserRole::Admin => return Ok(Json(user).into_response()),
    };

    Ok(Json(UserProfileResponse {
        name: user.name,
        email: user.email,
        role: user.role,
        courses,
    })
    .into_response())
}
