//! Integration tests for the liveness and readiness probes.

use dbk_integration_tests::TestStorefront;
use reqwest::StatusCode;

#[tokio::test]
async fn test_liveness_does_not_touch_backend() {
    let store = TestStorefront::spawn().await;

    let resp = store.get("/health").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap_or_default(), "ok");
    let received = store.backend.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_readiness_when_backend_answers() {
    let store = TestStorefront::spawn().await;
    store.mock_region().await;

    let resp = store.get("/health/ready").await;

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_when_backend_fails() {
    let store = TestStorefront::spawn().await;
    store
        .mock_error("GET", "/store/regions", 500, "database unavailable")
        .await;

    let resp = store.get("/health/ready").await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let store = TestStorefront::spawn().await;

    let resp = store.get("/health").await;

    let headers = resp.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("x-request-id"));
}
