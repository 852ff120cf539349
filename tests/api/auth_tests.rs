//! Authentication API Tests
//!
//! Everything here is rejected before a query is issued.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use crate::common::{body_json, TestApp};

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/auth/me").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], NOT_AUTHORIZED);
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/notifications", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], NOT_AUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let app = TestApp::new().await;
    let mut other = crate::common::test_settings();
    other.jwt.secret = "another-secret-that-is-long-enough-123".into();
    let token = riverforo::application::services::TokenIssuer::new(&other.jwt)
        .issue(42)
        .unwrap();

    let response = app.get_auth("/api/auth/me", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logged_out_cookie_is_ignored() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::get("/api/auth/me")
                .header(header::COOKIE, "token=none")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_authentication_first() {
    let app = TestApp::new().await;

    for uri in ["/api/users", "/api/ads/stats"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app
        .put_json("/api/categories/reorder", &json!({"categories": []}))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/auth/register",
            &json!({"username": "ab", "email": "not-an-email", "password": "123"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_register_rejects_unknown_language() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/auth/register",
            &json!({
                "username": "millonario",
                "email": "hincha@riverforo.com",
                "password": "monumental",
                "preferredLanguage": "pt"
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/auth/login", &json!({"email": "hincha@riverforo.com"}))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Please provide an email and password"
    );
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::post("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\":"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new().await;

    let response = app.get("/api/auth/logout").await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=none"));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_unknown_social_provider() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/auth/social/twitter",
            &json!({"accessToken": "x", "userData": {"id": "1", "email": "a@b.com"}}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
