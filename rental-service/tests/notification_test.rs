mod common;

use axum::http::StatusCode;
use common::TestApp;

/// Booking creation and card payment each leave one notification per admin.
async fn two_events(app: &TestApp) -> String {
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 2, 2500).await;
    app.paid_booking(&token, &camera, "2031-10-10", "2031-10-12")
        .await;
    token
}

#[tokio::test]
async fn unread_count_tracks_reads() {
    let app = TestApp::spawn().await;
    two_events(&app).await;

    let (status, body) = app.get("/notifications/unread-count", app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, inbox) = app.get("/notifications", app.admin()).await;
    let first = inbox[0]["id"].as_str().unwrap().to_string();
    let uri = format!("/notifications/{}/read", first);

    let (status, read) = app.post_empty(&uri, app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);
    let read_at = read["read_utc"].clone();

    // Reading again changes nothing.
    let (_, again) = app.post_empty(&uri, app.admin()).await;
    assert_eq!(again["read_utc"], read_at);

    let (_, body) = app.get("/notifications/unread-count", app.admin()).await;
    assert_eq!(body["count"], 1);

    let (_, unread) = app.get("/notifications?unread_only=true", app.admin()).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mark_all_read_reports_changed_rows() {
    let app = TestApp::spawn().await;
    two_events(&app).await;

    let (status, body) = app.post_empty("/notifications/read-all", app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, body) = app.post_empty("/notifications/read-all", app.admin()).await;
    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn each_admin_has_an_own_inbox() {
    let app = TestApp::spawn().await;
    let second = app
        .state
        .auth
        .create_admin("ops@studio.test", "ops-password", "Ops Desk")
        .await
        .unwrap();
    let second_token = second.token.access_token;
    two_events(&app).await;

    app.post_empty("/notifications/read-all", app.admin()).await;

    let (_, body) = app
        .get("/notifications/unread-count", Some(&second_token))
        .await;
    assert_eq!(body["count"], 2);

    // Another admin's notification cannot be marked from here.
    let (_, inbox) = app.get("/notifications", app.admin()).await;
    let uri = format!("/notifications/{}/read", inbox[0]["id"].as_str().unwrap());
    let (status, _) = app.post_empty(&uri, Some(&second_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customers_have_no_inbox() {
    let app = TestApp::spawn().await;
    let token = two_events(&app).await;

    let (status, _) = app.get("/notifications", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post_empty("/notifications/read-all", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
