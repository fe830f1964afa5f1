//! Router harness for coursework-http integration tests
//!
//! Builds the full router over an in-memory catalog, a temporary upload directory
//! and a rate limiter driven by a manual clock. Requests go through `oneshot`.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Method, Request, Response, header},
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use coursework_core::Config;
use coursework_core::domain::auth::{UserId, UserRole};
use coursework_core::domain::catalog::{
    IAssignmentRepository, ICourseRepository, IEnrollmentRepository, IUserRepository,
    NewAssignment, NewCourse, NewUser,
};
use coursework_core::infrastructure::auth::{JwtService, PasswordHasher};
use coursework_core::infrastructure::catalog::InMemoryCatalog;
use coursework_core::infrastructure::clock::ManualClock;
use coursework_core::infrastructure::files::LocalFileStore;
use coursework_core::infrastructure::rate_limiter::{InMemoryBucketStore, RateLimiterService};
use coursework_http::{AppState, create_router};

pub const PASSWORD: &str = "hunter2-correct-horse";
pub const DEFAULT_PEER: &str = "192.0.2.10:40000";

pub struct TestApp {
    pub router: Router,
    pub catalog: Arc<InMemoryCatalog>,
    pub jwt: Arc<JwtService>,
    pub hasher: Arc<PasswordHasher>,
    pub clock: ManualClock,
    pub config: Arc<Config>,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let uploads = TempDir::new().unwrap();

        let mut config = Config::default();
        config.uploads.directory = uploads.path().to_string_lossy().into_owned();
        customize(&mut config);
        let config = Arc::new(config);

        let catalog = Arc::new(InMemoryCatalog::new());
        let jwt = Arc::new(JwtService::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_ttl_hours,
        ));
        let hasher = Arc::new(PasswordHasher::with_params(4096, 1, 1));
        let clock = ManualClock::new(1_700_000_000_000);
        let rate_limiter = Arc::new(RateLimiterService::with_storage(
            Arc::new(InMemoryBucketStore::new()),
            Arc::new(clock.clone()),
            config.rate_limit.clone(),
        ));
        let files = Arc::new(LocalFileStore::new(uploads.path()).await.unwrap());

        let state = AppState::new(
            catalog.clone(),
            jwt.clone(),
            hasher.clone(),
            rate_limiter,
            files,
            config.clone(),
        );

        Self {
            router: create_router(state),
            catalog,
            jwt,
            hasher,
            clock,
            config,
            _uploads: uploads,
        }
    }

    /// Send a request from [`DEFAULT_PEER`]
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.send_from(DEFAULT_PEER, request).await
    }

    pub async fn send_from(&self, peer: &str, mut request: Request<Body>) -> Response<Body> {
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    pub async fn add_user(&self, email: &str, role: UserRole) -> UserId {
        let password_hash = self.hasher.hash(PASSWORD.to_string()).await.unwrap();
        self.catalog
            .create_user(NewUser {
                name: format!("User {}", email),
                email: email.to_string(),
                password_hash,
                role,
            })
            .await
            .unwrap()
            .id
    }

    pub fn token(&self, id: UserId, role: UserRole) -> String {
        self.jwt.generate_token(id, role).unwrap()
    }

    pub async fn add_course(&self, instructor: UserId, number: &str) -> i64 {
        self.catalog
            .create_course(NewCourse {
                subject: "CS".to_string(),
                number: number.to_string(),
                title: format!("Course {}", number),
                term: "sp25".to_string(),
                instructor_id: instructor,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn add_assignment(&self, course_id: i64) -> i64 {
        self.catalog
            .create_assignment(NewAssignment {
                course_id,
                title: "Assignment 1".to_string(),
                points: 100,
                due: Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 0).unwrap(),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn enroll(&self, course_id: i64, student: UserId) {
        self.catalog
            .update_enrollment(course_id, &[student], &[])
            .await
            .unwrap();
    }
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Multipart body with text fields and an optional file part
pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    const BOUNDARY: &str = "coursework-test-boundary";

    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// The `error` message of an error response
pub async fn error_message(response: Response<Body>) -> String {
    body_json(response).await["error"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
