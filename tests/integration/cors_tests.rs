//! CORS gate integration tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use super::test_utils::{body_json, body_message, get, with_origin, TestApp, FRONTEND_URL};

const ALLOW_ORIGIN: &str = "access-control-allow-origin";
const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";

fn preflight(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri(uri)
        .header(header::ORIGIN, origin)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,authorization")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_allowed_origins_get_credentialed_headers() {
    let app = TestApp::new();

    for origin in ["http://localhost:5173", "http://localhost:3000", FRONTEND_URL] {
        let response = app.send(with_origin(get("/api/health"), origin)).await;
        assert_eq!(response.status(), StatusCode::OK, "origin {}", origin);
        assert_eq!(response.headers().get(ALLOW_ORIGIN).unwrap(), origin);
        assert_eq!(response.headers().get(ALLOW_CREDENTIALS).unwrap(), "true");
    }
}

#[tokio::test]
async fn test_disallowed_origin_rejected() {
    let app = TestApp::new();

    for origin in [
        "https://evil.example",
        "http://localhost:5174",
        "https://studyshala.netlify.app.evil.example",
    ] {
        let response = app.send(with_origin(get("/api/health"), origin)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "origin {}", origin);
        assert!(response.headers().get(ALLOW_ORIGIN).is_none());
        assert!(response.headers().get(ALLOW_CREDENTIALS).is_none());
        assert_eq!(body_message(response).await, "Not allowed by CORS");
    }
}

#[tokio::test]
async fn test_rejection_happens_before_routing() {
    let app = TestApp::new();

    // Even a login attempt never reaches the handler.
    let request = with_origin(
        super::test_utils::post_json(
            "/api/auth/login",
            &serde_json::json!({ "identifier": super::test_utils::STUDENT, "password": super::test_utils::PASSWORD }),
        ),
        "https://evil.example",
    );
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(app.session_count().await, 0);

    // Unknown paths are rejected the same way rather than 404.
    let response = app
        .send(with_origin(get("/does/not/exist"), "https://evil.example"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_origin_allowed() {
    let app = TestApp::new();
    let response = app.send(get("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(ALLOW_ORIGIN).is_none());
    assert_eq!(body_json(response).await["status"], "OK");
}

#[tokio::test]
async fn test_preflight_from_allowed_origin() {
    let app = TestApp::new();
    let response = app
        .send(preflight("/api/auth/login", "http://localhost:5173"))
        .await;

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers.get(ALLOW_ORIGIN).unwrap(), "http://localhost:5173");
    assert_eq!(headers.get(ALLOW_CREDENTIALS).unwrap(), "true");

    let methods = headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap();
    for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
        assert!(methods.contains(method), "missing {} in {}", method, methods);
    }
    assert_eq!(headers.get("access-control-max-age").unwrap(), "86400");
}

#[tokio::test]
async fn test_preflight_from_disallowed_origin() {
    let app = TestApp::new();
    let response = app
        .send(preflight("/api/auth/login", "https://evil.example"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(ALLOW_ORIGIN).is_none());
}
