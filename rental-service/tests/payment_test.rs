mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rental_service::services::MockEmailService;
use serde_json::{json, Value};

async fn pending_booking(app: &TestApp, token: &str) -> Value {
    let camera = app.create_item("Sony FX3", 2, 2500).await;
    let (status, booking) = app
        .book_item(token, &camera, 1, "2031-10-10", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    booking
}

async fn pay(app: &TestApp, token: &str, booking: &Value, method: &str) -> (StatusCode, Value) {
    let mut body = json!({
        "booking_id": booking["id"],
        "method": method,
        "amount": booking["total"],
    });
    if method == "card" {
        body["transaction_id"] = json!("txn_4242");
    }
    app.post("/payments", Some(token), body).await
}

async fn booking_state(app: &TestApp, booking: &Value) -> Value {
    let uri = format!("/bookings/{}", booking["id"].as_str().unwrap());
    app.get(&uri, app.admin()).await.1
}

#[tokio::test]
async fn card_payment_completes_and_confirms_booking() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let (status, payment) = pay(&app, &token, &booking, "card").await;
    assert_eq!(status, StatusCode::CREATED, "{}", payment);
    assert_eq!(payment["status"], "completed");
    assert_eq!(payment["amount"], "5000");
    assert!(payment["completed_utc"].is_string());

    let booking = booking_state(&app, &booking).await;
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["payment_status"], "completed");

    let receipts: Vec<_> = app
        .email
        .sent()
        .into_iter()
        .filter(|m| m.subject.starts_with("Payment received"))
        .collect();
    assert_eq!(receipts.len(), 1);

    let (_, inbox) = app.get("/notifications", app.admin()).await;
    let kinds: Vec<_> = inbox
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"payment_received".to_string()));
}

#[tokio::test]
async fn card_payment_needs_transaction_id() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let (status, body) = app
        .post(
            "/payments",
            Some(&token),
            json!({ "booking_id": booking["id"], "method": "card", "amount": booking["total"] }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn amount_must_match_booking_total() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let (status, _) = app
        .post(
            "/payments",
            Some(&token),
            json!({
                "booking_id": booking["id"],
                "method": "cash",
                "amount": "4999.99"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let booking = booking_state(&app, &booking).await;
    assert_eq!(booking["payment_status"], "pending");
}

#[tokio::test]
async fn cash_payment_waits_for_admin() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let (status, payment) = pay(&app, &token, &booking, "cash").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "pending");
    assert_eq!(booking_state(&app, &booking).await["payment_status"], "pending");

    // Only one open payment per booking.
    let (status, _) = pay(&app, &token, &booking, "bank_transfer").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let complete = format!("/payments/{}/complete", payment["id"].as_str().unwrap());
    let (status, _) = app.post_empty(&complete, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, completed) = app.post_empty(&complete, app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    let state = booking_state(&app, &booking).await;
    assert_eq!(state["status"], "confirmed");
    assert_eq!(state["payment_status"], "completed");

    // A completed payment cannot be completed again.
    let (status, _) = app.post_empty(&complete, app.admin()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_transfer_can_be_retried_by_card() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let (_, transfer) = pay(&app, &token, &booking, "bank_transfer").await;
    let fail = format!("/payments/{}/fail", transfer["id"].as_str().unwrap());
    let (status, failed) = app
        .post(&fail, app.admin(), json!({ "note": "transfer bounced" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["note"], "transfer bounced");
    assert_eq!(booking_state(&app, &booking).await["payment_status"], "failed");

    let (status, card) = pay(&app, &token, &booking, "card").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(card["status"], "completed");
    assert_eq!(booking_state(&app, &booking).await["payment_status"], "completed");

    let uri = format!("/bookings/{}/payments", booking["id"].as_str().unwrap());
    let (status, payments) = app.get(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_can_reverse_a_completed_payment() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;
    let (_, payment) = pay(&app, &token, &booking, "card").await;

    let uri = format!("/payments/{}/status", payment["id"].as_str().unwrap());
    let (status, reversed) = app
        .request(
            Method::PATCH,
            &uri,
            app.admin(),
            Some(json!({ "status": "failed", "note": "chargeback" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", reversed);
    assert_eq!(reversed["status"], "failed");

    let state = booking_state(&app, &booking).await;
    assert_eq!(state["status"], "confirmed");
    assert_eq!(state["payment_status"], "failed");

    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            app.admin(),
            Some(json!({ "status": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cancelled_booking_refuses_payment() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let cancel = format!("/bookings/{}/cancel", booking["id"].as_str().unwrap());
    app.post_empty(&cancel, Some(&token)).await;

    let (status, body) = pay(&app, &token, &booking, "card").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn open_transfer_on_cancelled_booking_can_be_failed() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;
    let (_, transfer) = pay(&app, &token, &booking, "bank_transfer").await;
    assert_eq!(transfer["status"], "pending");

    let cancel = format!("/bookings/{}/cancel", booking["id"].as_str().unwrap());
    let (status, _) = app.post_empty(&cancel, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let id = transfer["id"].as_str().unwrap();
    let (status, body) = app
        .post_empty(&format!("/payments/{}/complete", id), app.admin())
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let (status, failed) = app
        .post(
            &format!("/payments/{}/fail", id),
            app.admin(),
            json!({ "note": "booking cancelled" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", failed);
    assert_eq!(failed["status"], "failed");

    let state = booking_state(&app, &booking).await;
    assert_eq!(state["status"], "cancelled");
    assert_eq!(state["payment_status"], "failed");
}

#[tokio::test]
async fn email_outage_does_not_fail_payment() {
    let app = TestApp::spawn_with_email(MockEmailService::failing()).await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let booking = pending_booking(&app, &token).await;

    let (status, payment) = pay(&app, &token, &booking, "card").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "completed");
    assert!(app.email.sent().is_empty());
}

#[tokio::test]
async fn strangers_cannot_pay_for_or_list_a_booking() {
    let app = TestApp::spawn().await;
    let (asha, _) = app.register_customer("asha@example.com").await;
    let (ravi, _) = app.register_customer("ravi@example.com").await;
    let booking = pending_booking(&app, &asha).await;

    let (status, _) = pay(&app, &ravi, &booking, "card").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/bookings/{}/payments", booking["id"].as_str().unwrap());
    let (status, _) = app.get(&uri, Some(&ravi)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
