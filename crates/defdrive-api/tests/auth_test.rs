//! API tests for signup, login, and health.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{PASSWORD, TestApp};

#[tokio::test]
async fn test_signup_hides_password_hash() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/signup",
            Some(json!({ "username": "alice", "name": "Alice", "password": PASSWORD })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["display_name"], "Alice");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = TestApp::new().await;
    app.register("bob").await;

    let response = app
        .request(
            "POST",
            "/api/signup",
            Some(json!({ "username": "bob", "password": PASSWORD })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "CONFLICT");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/signup",
            Some(json!({ "username": "", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "POST",
            "/api/signup",
            Some(json!({ "username": "carol", "password": "short" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    app.register("dave").await;

    let wrong_password = app
        .request(
            "POST",
            "/api/login",
            Some(json!({ "username": "dave", "password": "not-the-password" })),
            None,
        )
        .await;
    let unknown_user = app
        .request(
            "POST",
            "/api/login",
            Some(json!({ "username": "nobody", "password": PASSWORD })),
            None,
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json()["message"], unknown_user.json()["message"]);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/files", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", "/api/files", None, Some("not.a.jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["status"], "ok");

    let response = app.request("GET", "/api/health/detailed", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.json()["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["database"]["backend"], "memory");
    assert_eq!(data["storage"]["backend"], "local");
}
