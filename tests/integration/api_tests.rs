//! API integration tests for health, the 404 boundary and the route groups.
//!
//! Tests verify:
//! - Health check shape
//! - Unmatched routes return the JSON 404 body
//! - Request validation errors are JSON
//! - Admin and faculty endpoints

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::DateTime;
use serde_json::json;

use studyshala::Environment;

use super::test_utils::{
    body_json, body_message, get, post_json, with_bearer, TestApp, ADMIN, FACULTY,
    SECOND_STUDENT, STUDENT,
};

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app.send(get("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "development");

    let timestamp = body["timestamp"].as_str().unwrap();
    let parsed = DateTime::parse_from_rfc3339(timestamp).unwrap();
    assert_eq!(parsed, app.clock_now());
}

#[tokio::test]
async fn test_health_reports_production() {
    let app = TestApp::with_environment(Environment::Production);
    let body = body_json(app.send(get("/api/health")).await).await;
    assert_eq!(body["environment"], "production");
}

#[tokio::test]
async fn test_health_creates_no_session() {
    let app = TestApp::new();
    let response = app.send(get("/api/health")).await;
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(app.session_count().await, 0);
}

// =============================================================================
// 404 Boundary
// =============================================================================

#[tokio::test]
async fn test_unknown_routes_return_json_404() {
    let app = TestApp::new();

    for uri in ["/", "/nope", "/api", "/api/unknown", "/api/admin/nothing-here"] {
        let response = app.send(get(uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await, json!({ "message": "Route not found" }));
    }
}

#[tokio::test]
async fn test_wrong_method_on_known_path_is_json_404() {
    let app = TestApp::new();
    let (admin, _) = app.login(ADMIN).await;

    for (method, uri) in [
        ("PUT", "/api/health"),
        ("GET", "/api/auth/login"),
        ("PUT", "/api/admin/users"),
        ("PATCH", "/api/admin/users/some-id"),
    ] {
        let request = with_bearer(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
            &admin,
        );
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body_json(response).await, json!({ "message": "Route not found" }));
    }
}

// =============================================================================
// Request Validation
// =============================================================================

#[tokio::test]
async fn test_login_requires_fields() {
    let app = TestApp::new();

    let response = app
        .send(post_json("/api/auth/login", &json!({ "identifier": STUDENT })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_message(response).await,
        "Identifier and password are required"
    );
}

#[tokio::test]
async fn test_malformed_json_is_json_error() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_login_accepts_email_field() {
    let app = TestApp::new();
    let response = app
        .send(post_json(
            "/api/auth/login",
            &json!({ "email": STUDENT, "password": super::test_utils::PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Faculty Endpoints
// =============================================================================

#[tokio::test]
async fn test_faculty_lists_students() {
    let app = TestApp::new();
    let (token, _) = app.login(FACULTY).await;

    let response = app
        .send(with_bearer(get("/api/faculty/students"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let identifiers: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(identifiers, vec![STUDENT, SECOND_STUDENT]);
    assert!(!body.to_string().contains("password"));
}

// =============================================================================
// Admin Endpoints
// =============================================================================

#[tokio::test]
async fn test_admin_lists_users_with_role_filter() {
    let app = TestApp::new();
    let (token, _) = app.login(ADMIN).await;

    let all = body_json(app.send(with_bearer(get("/api/admin/users"), &token)).await).await;
    assert_eq!(all["users"].as_array().unwrap().len(), 4);

    let faculty = body_json(
        app.send(with_bearer(get("/api/admin/users?role=faculty"), &token))
            .await,
    )
    .await;
    let faculty = faculty["users"].as_array().unwrap();
    assert_eq!(faculty.len(), 1);
    assert_eq!(faculty[0]["identifier"], FACULTY);

    let response = app
        .send(with_bearer(get("/api/admin/users?role=janitor"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_creates_user() {
    let app = TestApp::new();
    let (token, _) = app.login(ADMIN).await;

    let response = app
        .send(with_bearer(
            post_json(
                "/api/admin/users",
                &json!({
                    "identifier": "Neha@StudyShala.test",
                    "name": "Neha Verma",
                    "password": "long-enough-pw",
                    "role": "faculty"
                }),
            ),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["user"]["identifier"], "neha@studyshala.test");
    assert_eq!(body["user"]["role"], "faculty");
    assert!(body["user"].get("password_hash").is_none());

    // The new principal can log in.
    let response = app
        .send(post_json(
            "/api/auth/login",
            &json!({ "identifier": "neha@studyshala.test", "password": "long-enough-pw" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_create_user_validation() {
    let app = TestApp::new();
    let (token, _) = app.login(ADMIN).await;

    let create = |body: serde_json::Value| with_bearer(post_json("/api/admin/users", &body), &token);

    let response = app
        .send(create(json!({ "identifier": "x@studyshala.test", "name": "", "password": "long-enough-pw", "role": "student" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(create(json!({ "identifier": "x@studyshala.test", "name": "X", "password": "short", "role": "student" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_message(response).await,
        "Password must be at least 8 characters"
    );

    let response = app
        .send(create(json!({ "identifier": "x@studyshala.test", "name": "X", "password": "long-enough-pw", "role": "root" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(create(json!({ "identifier": STUDENT, "name": "Dup", "password": "long-enough-pw", "role": "student" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_message(response).await, "Identifier already registered");
}

#[tokio::test]
async fn test_admin_get_and_delete_user() {
    let app = TestApp::new();
    let (token, _) = app.login(ADMIN).await;
    let student = app.principal(SECOND_STUDENT).await;
    let uri = format!("/api/admin/users/{}", student.id);

    let response = app.send(with_bearer(get(&uri), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"]["name"], "Kabir Shah");

    let delete = |uri: &str| {
        with_bearer(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
            &token,
        )
    };

    let response = app.send(delete(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_message(response).await, "User deleted");

    let response = app.send(delete(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_message(response).await, "User not found");

    let response = app.send(with_bearer(get(&uri), &token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = TestApp::new();
    let (token, _) = app.login(ADMIN).await;
    let admin = app.principal(ADMIN).await;

    let request = with_bearer(
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/admin/users/{}", admin.id))
            .body(Body::empty())
            .unwrap(),
        &token,
    );
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_message(response).await,
        "Admins cannot delete their own account"
    );
}
