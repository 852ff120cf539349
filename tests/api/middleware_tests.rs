//! Middleware Stack Tests
//!
//! Security headers, CORS and the `/api` rate limit, observed through the
//! full router.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};

use crate::common::{body_json, test_settings, TestApp};

fn from_client(uri: &str, ip: &str) -> Request<Body> {
    Request::get(uri)
        .header("X-Forwarded-For", ip)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = TestApp::new().await;

    for uri in ["/health", "/does-not-exist", "/api/auth/me"] {
        let response = app.get(uri).await;
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff", "{}", uri);
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN", "{}", uri);
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer", "{}", uri);
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY), "{}", uri);
        assert!(headers.get("x-powered-by").is_none(), "{}", uri);
    }
}

#[tokio::test]
async fn test_hsts_only_in_production() {
    let app = TestApp::new().await;
    let response = app.get("/health").await;
    assert!(response
        .headers()
        .get(header::STRICT_TRANSPORT_SECURITY)
        .is_none());

    let mut settings = test_settings();
    settings.environment = "production".into();
    let app = TestApp::with_settings(settings).await;
    let response = app.get("/health").await;
    assert_eq!(
        response.headers()[header::STRICT_TRANSPORT_SECURITY],
        "max-age=15552000; includeSubDomains"
    );
}

#[tokio::test]
async fn test_cors_preflight_for_client_origin() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::options("/api/threads")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_foreign_origin() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::get("/health")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let mut settings = test_settings();
    settings.rate_limit.requests_per_window = 2;
    let app = TestApp::with_settings(settings).await;

    let first = app.send(from_client("/api/auth/me", "203.0.113.7")).await;
    assert_eq!(first.headers()["x-ratelimit-limit"], "2");
    assert_eq!(first.headers()["x-ratelimit-remaining"], "1");

    let second = app.send(from_client("/api/auth/me", "203.0.113.7")).await;
    assert_eq!(second.headers()["x-ratelimit-remaining"], "0");

    let third = app.send(from_client("/api/auth/me", "203.0.113.7")).await;
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(third.headers().contains_key(header::RETRY_AFTER));
    let json = body_json(third).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Too many requests, please try again later");

    // A different client still gets through
    let other = app.send(from_client("/api/auth/me", "198.51.100.1")).await;
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rate_limit_does_not_cover_health() {
    let mut settings = test_settings();
    settings.rate_limit.requests_per_window = 1;
    let app = TestApp::with_settings(settings).await;

    for _ in 0..3 {
        let response = app.send(from_client("/health", "203.0.113.9")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_rate_limit_falls_back_to_socket_address() {
    let mut settings = test_settings();
    settings.rate_limit.requests_per_window = 1;
    let app = TestApp::with_settings(settings).await;

    let from_socket = |port: u16| {
        Request::get("/api/auth/me")
            .extension(ConnectInfo(SocketAddr::from(([192, 0, 2, 44], port))))
            .body(Body::empty())
            .unwrap()
    };

    let first = app.send(from_socket(5000)).await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    // Same address from another port is the same client
    let second = app.send(from_socket(5001)).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
