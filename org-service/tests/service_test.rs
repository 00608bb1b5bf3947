mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["service"], "org-service");
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/metrics", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_common_response_headers() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.headers.get("x-request-id").unwrap(), "req-123");
    assert_eq!(res.headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(res.headers.get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_signin_is_rate_limited_per_ip() {
    let app = TestApp::with_vars(&[("RATE_LIMIT_SIGNIN_ATTEMPTS", "2")]);

    let signin = |ip: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/auth/signin")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({ "email": "nobody@example.com", "password": "whatever1" }).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(app.send(signin("10.0.0.1")).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(signin("10.0.0.1")).await.status, StatusCode::UNAUTHORIZED);

    let limited = app.send(signin("10.0.0.1")).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers.get("retry-after").is_some());

    assert_eq!(app.send(signin("10.0.0.2")).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wildcard_cors_origin_allows_any_origin() {
    let app = TestApp::with_vars(&[("ALLOWED_ORIGINS", "*")]);
    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://anywhere.example.com")
        .body(Body::empty())
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers.get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn test_cors_origin_list_echoes_only_listed_origins() {
    let app = TestApp::with_vars(&[(
        "ALLOWED_ORIGINS",
        "https://app.example.com,https://admin.example.com",
    )]);

    let allowed = Request::builder()
        .uri("/health")
        .header("origin", "https://admin.example.com")
        .body(Body::empty())
        .unwrap();
    let res = app.send(allowed).await;
    assert_eq!(
        res.headers.get("access-control-allow-origin").unwrap(),
        "https://admin.example.com"
    );

    let other = Request::builder()
        .uri("/health")
        .header("origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let res = app.send(other).await;
    assert!(res.headers.get("access-control-allow-origin").is_none());
}
