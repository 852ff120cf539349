//! Routing Tests
//!
//! Fallback handling, path id parsing and role gates.

use axum::http::StatusCode;
use serde_json::json;
use test_case::test_case;

use crate::common::{body_json, TestApp};

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = TestApp::new().await;

    let response = app.get("/api/v2/threads").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json, json!({"success": false, "error": "Not found"}));
}

#[test_case("/api/threads/abc", "Thread not found with id of abc"; "thread")]
#[test_case("/api/posts/12x", "Post not found with id of 12x"; "post")]
#[test_case("/api/categories/-", "Category not found with id of -"; "category")]
#[test_case("/api/users/nobody", "User not found with id of nobody"; "user")]
#[tokio::test]
async fn test_malformed_ids_are_not_found(uri: &str, message: &str) {
    let app = TestApp::new().await;

    let response = app.get(uri).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], message);
}

#[test_case("/api/threads/1/sticky"; "sticky")]
#[test_case("/api/threads/1/lock"; "lock")]
#[test_case("/api/posts/1/like"; "like")]
#[test_case("/api/notifications/read-all"; "read all")]
#[tokio::test]
async fn test_protected_writes_require_token(uri: &str) {
    let app = TestApp::new().await;

    let response = app.put_json(uri, &json!({})).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_creating_thread_requires_token() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/threads",
            &json!({"title": "Superclásico", "content": "Vamos River", "category": "1"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
