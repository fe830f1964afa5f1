//! Gate-chain tests: authentication, roles, ownership, body validation and
//! rate limiting as seen through the router

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use std::time::Duration;

use coursework_core::domain::auth::{UserId, UserRole};
use coursework_core::infrastructure::auth::JwtService;

use common::{TestApp, error_message, request};

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_protected_route_without_token_is_401() {
    let app = TestApp::new().await;
    let student = app.add_user("s@example.com", UserRole::Student).await;

    let response = app.get(&format!("/users/{}", student), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await, "Invalid authentication token.");
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_401() {
    let app = TestApp::new().await;
    let student = app.add_user("s@example.com", UserRole::Student).await;
    let forged = JwtService::new("not-the-server-secret".to_string(), 24)
        .generate_token(student, UserRole::Admin)
        .unwrap();

    let response = app.get(&format!("/users/{}", student), Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_401() {
    let app = TestApp::new().await;
    let student = app.add_user("s@example.com", UserRole::Student).await;
    let token = app.token(student, UserRole::Student);

    let mut req = request(Method::GET, &format!("/users/{}", student), None, None);
    req.headers_mut()
        .insert("authorization", format!("Token {}", token).parse().unwrap());

    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejected_tokens_do_not_spend_rate_limit_tokens() {
    let app = TestApp::new().await;
    let student = app.add_user("s@example.com", UserRole::Student).await;

    // Authentication runs before the limiter, so none of these reach a bucket
    for _ in 0..15 {
        let response = app
            .get(&format!("/users/{}", student), Some("garbage"))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

// ============================================================================
// Roles
// ============================================================================

#[tokio::test]
async fn test_course_creation_requires_admin() {
    let app = TestApp::new().await;
    let instructor = app.add_user("i@example.com", UserRole::Instructor).await;
    let admin = app.add_user("a@example.com", UserRole::Admin).await;
    let body = json!({
        "subject": "CS",
        "number": "493",
        "title": "Cloud Application Development",
        "term": "sp25",
        "instructorId": instructor,
    });

    let response = app
        .post_json(
            "/courses",
            Some(&app.token(instructor, UserRole::Instructor)),
            body.clone(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        error_message(response).await,
        "Unauthorized to access the specified resource."
    );

    let response = app
        .post_json("/courses", Some(&app.token(admin, UserRole::Admin)), body)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_course_deletion_requires_admin() {
    let app = TestApp::new().await;
    let instructor = app.add_user("i@example.com", UserRole::Instructor).await;
    let admin = app.add_user("a@example.com", UserRole::Admin).await;
    let course = app.add_course(instructor, "493").await;
    let uri = format!("/courses/{}", course);

    // Owning the course is not enough
    let response = app
        .delete(&uri, Some(&app.token(instructor, UserRole::Instructor)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_token = app.token(admin, UserRole::Admin);
    let response = app.delete(&uri, Some(&admin_token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.delete(&uri, Some(&admin_token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Ownership
// ============================================================================

#[tokio::test]
async fn test_user_profile_is_visible_to_self_only() {
    let app = TestApp::new().await;
    let alice = app.add_user("alice@example.com", UserRole::Student).await;
    let bob = app.add_user("bob@example.com", UserRole::Student).await;
    let alice_token = app.token(alice, UserRole::Student);

    let response = app.get(&format!("/users/{}", alice), Some(&alice_token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&format!("/users/{}", bob), Some(&alice_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_target_is_404_for_owners_and_admins() {
    let app = TestApp::new().await;
    let student = app.add_user("s@example.com", UserRole::Student).await;
    let admin = app.add_user("a@example.com", UserRole::Admin).await;

    // Stopped by the ownership gate
    let response = app
        .get("/users/9999", Some(&app.token(student, UserRole::Student)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(response).await,
        "Requested resource does not exist."
    );

    // Admins skip the lookup and reach the handler
    let response = app
        .get("/users/9999", Some(&app.token(admin, UserRole::Admin)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "User not found.");
}

#[tokio::test]
async fn test_non_numeric_id_is_404() {
    let app = TestApp::new().await;
    let student = app.add_user("s@example.com", UserRole::Student).await;

    let response = app
        .get("/users/not-a-number", Some(&app.token(student, UserRole::Student)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_course_update_by_other_instructor_is_403() {
    let app = TestApp::new().await;
    let owner = app.add_user("owner@example.com", UserRole::Instructor).await;
    let other = app.add_user("other@example.com", UserRole::Instructor).await;
    let course = app.add_course(owner, "493").await;

    let response = app
        .patch_json(
            &format!("/courses/{}", course),
            Some(&app.token(other, UserRole::Instructor)),
            json!({ "title": "Hijacked" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .patch_json(
            &format!("/courses/{}", course),
            Some(&app.token(owner, UserRole::Instructor)),
            json!({ "title": "Renamed" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_assignment_creation_checks_course_in_body() {
    let app = TestApp::new().await;
    let owner = app.add_user("owner@example.com", UserRole::Instructor).await;
    let other = app.add_user("other@example.com", UserRole::Instructor).await;
    let course = app.add_course(owner, "493").await;
    let body = |course_id: i64| {
        json!({
            "courseId": course_id,
            "title": "Assignment 1",
            "points": 100,
            "due": "2025-06-01T23:59:00Z",
        })
    };

    let response = app
        .post_json(
            "/assignments",
            Some(&app.token(other, UserRole::Instructor)),
            body(course),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let owner_token = app.token(owner, UserRole::Instructor);
    let response = app
        .post_json("/assignments", Some(&owner_token), body(9999))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_json("/assignments", Some(&owner_token), body(course))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_grading_follows_submission_to_course_instructor() {
    let app = TestApp::new().await;
    let owner = app.add_user("owner@example.com", UserRole::Instructor).await;
    let other = app.add_user("other@example.com", UserRole::Instructor).await;
    let student = app.add_user("s@example.com", UserRole::Student).await;
    let course = app.add_course(owner, "493").await;
    let assignment = app.add_assignment(course).await;
    app.enroll(course, student).await;

    let submission = {
        use coursework_core::domain::catalog::{ISubmissionRepository, NewSubmission};
        app.catalog
            .create_submission(NewSubmission {
                assignment_id: assignment,
                student_id: student,
                timestamp: chrono::Utc::now(),
                file: "essay.pdf".to_string(),
            })
            .await
            .unwrap()
            .id
    };
    let uri = format!("/submissions/{}", submission);

    for (who, role) in [(other, UserRole::Instructor), (student, UserRole::Student)] {
        let response = app
            .patch_json(&uri, Some(&app.token(who, role)), json!({ "grade": 90.0 }))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let response = app
        .patch_json(
            &uri,
            Some(&app.token(owner, UserRole::Instructor)),
            json!({ "grade": 92.5 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Body validation
// ============================================================================

#[tokio::test]
async fn test_patch_without_body_is_400() {
    let app = TestApp::new().await;
    let owner = app.add_user("owner@example.com", UserRole::Instructor).await;
    let course = app.add_course(owner, "493").await;
    let token = app.token(owner, UserRole::Instructor);

    let response = app
        .send(request(
            Method::PATCH,
            &format!("/courses/{}", course),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Body not included.");

    let response = app
        .patch_json(&format!("/courses/{}", course), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_required_field_is_named() {
    let app = TestApp::new().await;
    let admin = app.add_user("a@example.com", UserRole::Admin).await;

    let response = app
        .post_json(
            "/courses",
            Some(&app.token(admin, UserRole::Admin)),
            json!({ "subject": "CS", "number": "493", "title": "Cloud", "term": "sp25" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Missing required body parameter \"instructorId\"."
    );
}

#[tokio::test]
async fn test_required_fields_run_before_body_keyed_ownership() {
    let app = TestApp::new().await;
    let instructor = app.add_user("i@example.com", UserRole::Instructor).await;

    let response = app
        .post_json(
            "/assignments",
            Some(&app.token(instructor, UserRole::Instructor)),
            json!({ "title": "No course" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Missing required body parameter \"courseId\"."
    );
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_anonymous_bucket_limits_by_address() {
    let app = TestApp::new().await;

    for i in 0..10 {
        let response = app.get("/courses", None).await;
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (9 - i).to_string().as_str()
        );
    }

    let response = app.get("/courses", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "6");
    assert_eq!(error_message(response).await, "Too many requests per minute.");

    // A different address has its own bucket
    let response = app
        .send_from("198.51.100.20:1234", request(Method::GET, "/courses", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // One anonymous token refills every 6s
    app.clock.advance(Duration::from_secs(6));
    assert_eq!(app.get("/courses", None).await.status(), StatusCode::OK);
    assert_eq!(
        app.get("/courses", None).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_authenticated_bucket_is_per_user() {
    let app = TestApp::new().await;
    let alice = app.add_user("alice@example.com", UserRole::Student).await;
    let bob = app.add_user("bob@example.com", UserRole::Student).await;
    let alice_token = app.token(alice, UserRole::Student);
    let alice_uri = format!("/users/{}", alice);

    for _ in 0..30 {
        let response = app.get(&alice_uri, Some(&alice_token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.get(&alice_uri, Some(&alice_token)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "2");

    // Same address, different user
    let response = app
        .get(&format!("/users/{}", bob), Some(&app.token(bob, UserRole::Student)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance(Duration::from_millis(2_000));
    assert_eq!(
        app.get(&alice_uri, Some(&alice_token)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_disabled_rate_limiting_sets_no_headers() {
    let app = TestApp::with_config(|config| config.rate_limit.enabled = false).await;

    for _ in 0..20 {
        let response = app.get("/courses", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_unknown_user_id_in_token_is_still_rate_limited_per_user() {
    let app = TestApp::new().await;
    // Token for a user the catalog has never seen: authentication only checks the signature
    let token = app.token(UserId(4242), UserRole::Student);

    let response = app.get("/users/4242", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-ratelimit-limit"], "30");
}
