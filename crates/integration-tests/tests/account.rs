//! Integration tests for sign-in, the profile page and sign-out.

use dbk_integration_tests::{TestStorefront, customer, location};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mock_signed_in_backend(store: &TestStorefront) {
    store.mock_region().await;
    Mock::given(method("POST"))
        .and(path("/auth/customer/emailpass"))
        .and(body_partial_json(
            json!({ "email": "asha@example.com", "password": "correct horse" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok_asha" })))
        .mount(&store.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/store/customers/me"))
        .and(header("authorization", "Bearer tok_asha"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customer": customer() })),
        )
        .mount(&store.backend)
        .await;
}

async fn sign_in(store: &TestStorefront) -> reqwest::Response {
    store
        .post_form(
            "/auth/login",
            &[("email", "asha@example.com"), ("password", "correct horse")],
        )
        .await
}

#[tokio::test]
async fn test_profile_shows_login_to_visitors() {
    let store = TestStorefront::spawn().await;

    let resp = store.get("/profile").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap_or_default();
    assert!(body.contains("action=\"/auth/login\""));
}

#[tokio::test]
async fn test_profile_register_flag_shows_registration() {
    let store = TestStorefront::spawn().await;

    let resp = store.get("/profile?register=1").await;

    let body = resp.text().await.unwrap_or_default();
    assert!(body.contains("Create account"));
}

#[tokio::test]
async fn test_login_with_blank_fields_is_rejected_locally() {
    let store = TestStorefront::spawn().await;

    let resp = store
        .post_form("/auth/login", &[("email", ""), ("password", "")])
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile?error=Please%20fill%20all%20fields.");
    let received = store.backend.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_login_shows_backend_rejection() {
    let store = TestStorefront::spawn().await;
    store
        .mock_error(
            "POST",
            "/auth/customer/emailpass",
            401,
            "Invalid email or password",
        )
        .await;

    let resp = store
        .post_form(
            "/auth/login",
            &[("email", "asha@example.com"), ("password", "wrong")],
        )
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        "/profile?error=Invalid%20email%20or%20password"
    );
}

#[tokio::test]
async fn test_login_then_profile_then_logout() {
    let store = TestStorefront::spawn().await;
    mock_signed_in_backend(&store).await;

    let resp = sign_in(&store).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile");

    let profile = store.get("/profile").await;
    assert_eq!(profile.status(), StatusCode::OK);
    let body = profile.text().await.unwrap_or_default();
    assert!(body.contains("Asha Rao"));
    assert!(body.contains("asha@example.com"));

    let resp = store.post_form("/auth/logout", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile");

    let profile = store.get("/profile").await;
    let body = profile.text().await.unwrap_or_default();
    assert!(body.contains("action=\"/auth/login\""));
    assert!(!body.contains("Asha Rao"));
}

#[tokio::test]
async fn test_profile_update_requires_sign_in() {
    let store = TestStorefront::spawn().await;

    let resp = store
        .post_form("/profile", &[("first_name", "Asha")])
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/profile"));
}

#[tokio::test]
async fn test_profile_update_sends_only_filled_fields() {
    let store = TestStorefront::spawn().await;
    mock_signed_in_backend(&store).await;
    Mock::given(method("POST"))
        .and(path("/store/customers/me"))
        .and(header("authorization", "Bearer tok_asha"))
        .and(body_partial_json(json!({ "first_name": "Asha" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customer": customer() })),
        )
        .expect(1)
        .mount(&store.backend)
        .await;

    sign_in(&store).await;
    let resp = store
        .post_form(
            "/profile",
            &[("first_name", "Asha"), ("last_name", ""), ("phone", " ")],
        )
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/profile?success=Profile%20updated.");

    let requests = store.backend.received_requests().await.unwrap_or_default();
    let update = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/store/customers/me");
    let body: serde_json::Value = update
        .and_then(|r| serde_json::from_slice(&r.body).ok())
        .unwrap_or_default();
    assert!(body.get("last_name").is_none());
    assert!(body.get("phone").is_none());
}
