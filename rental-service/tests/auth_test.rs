mod common;

use axum::http::StatusCode;
use common::{TestApp, ADMIN_EMAIL};
use serde_json::json;

#[tokio::test]
async fn health_and_readiness() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "rental-service");

    let (status, body) = app.get("/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, _) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_then_login_and_fetch_profile() {
    let app = TestApp::spawn().await;

    let (status, registered) = app
        .post(
            "/auth/register",
            None,
            json!({
                "email": "Asha@Example.com",
                "password": "customer-password",
                "name": "Asha Rao"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", registered);
    assert_eq!(registered["token_type"], "Bearer");
    assert_eq!(registered["user"]["email"], "asha@example.com");
    assert_eq!(registered["user"]["role"], "customer");
    assert!(registered["user"].get("password_hash").is_none());

    let (status, login) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "asha@example.com", "password": "customer-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["access_token"].as_str().unwrap();

    let (status, me) = app.get("/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], registered["user"]["id"]);
    assert_eq!(me["name"], "Asha Rao");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;
    app.register_customer("asha@example.com").await;

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({
                "email": "ASHA@example.com",
                "password": "another-password",
                "name": "Someone Else"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = TestApp::spawn().await;
    app.register_customer("asha@example.com").await;

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "asha@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "whatever-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_input_is_validated() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "customer-password", "name": "Asha" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "asha@example.com", "password": "short", "name": "Asha" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn tokens_are_checked() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/auth/me", Some("not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.get("/auth/me", app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["role"], "admin");
}
