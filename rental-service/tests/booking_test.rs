mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn overlapping_booking_beyond_stock_is_rejected() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 2, 2500).await;

    let (status, _) = app
        .book_item(&token, &camera, 2, "2031-10-10", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .book_item(&token, &camera, 1, "2031-10-11", "2031-10-13")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "insufficient_availability");

    // Both units come back on the 12th.
    let (status, _) = app
        .book_item(&token, &camera, 1, "2031-10-12", "2031-10-14")
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn booking_total_is_days_times_rate_times_quantity() {
    let app = TestApp::spawn().await;
    let (token, user_id) = app.register_customer("asha@example.com").await;
    let studio = app.create_item("Studio A", 1, 2500).await;

    let (status, body) = app
        .book_item(&token, &studio, 1, "2031-10-10", "2031-10-13")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], "7500");
    assert_eq!(body["lines"][0]["days"], 3);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_status"], "pending");
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["customer"]["email"], "asha@example.com");
    assert!(body["reference"].as_str().unwrap().starts_with("BK-"));
}

#[tokio::test]
async fn end_date_must_follow_start_date() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 1, 2500).await;

    let (status, body) = app
        .book_item(&token, &camera, 1, "2031-10-12", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_date_range");
}

#[tokio::test]
async fn lines_in_one_request_count_against_each_other() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let light = app.create_item("Aputure 600d", 3, 1200).await;

    let line = |quantity: u32| {
        json!({
            "item_id": light,
            "quantity": quantity,
            "start_date": "2031-11-01",
            "end_date": "2031-11-03"
        })
    };

    let (status, body) = app
        .post("/bookings", Some(&token), json!({ "lines": [line(2), line(2)] }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "insufficient_availability");

    let (status, body) = app
        .post("/bookings", Some(&token), json!({ "lines": [line(2), line(1)] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], "7200");
}

#[tokio::test]
async fn package_reserves_its_components() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 3, 2500).await;

    let (status, package) = app
        .post(
            "/packages",
            app.admin(),
            json!({
                "name": "Two camera kit",
                "components": [{ "item_id": camera, "quantity": 2 }],
                "price_per_day": 4500
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", package);

    let (status, booking) = app
        .post(
            "/bookings",
            Some(&token),
            json!({
                "lines": [{
                    "package_id": package["id"],
                    "quantity": 1,
                    "start_date": "2031-10-10",
                    "end_date": "2031-10-12"
                }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", booking);
    assert_eq!(booking["total"], "9000");

    let (status, _) = app
        .book_item(&token, &camera, 2, "2031-10-11", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .book_item(&token, &camera, 1, "2031-10-11", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn line_needs_exactly_one_target() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;

    let (status, body) = app
        .post(
            "/bookings",
            Some(&token),
            json!({
                "lines": [{
                    "quantity": 1,
                    "start_date": "2031-10-10",
                    "end_date": "2031-10-12"
                }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn retired_items_cannot_be_booked() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 1, 2500).await;

    let (status, _) = app
        .request(
            axum::http::Method::DELETE,
            &format!("/inventory/{}", camera),
            app.admin(),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .book_item(&token, &camera, 1, "2031-10-10", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "item_unavailable");
}

#[tokio::test]
async fn cancelling_releases_stock() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 1, 2500).await;

    let (_, booking) = app
        .book_item(&token, &camera, 1, "2031-10-10", "2031-10-12")
        .await;
    let (status, _) = app
        .book_item(&token, &camera, 1, "2031-10-11", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/bookings/{}/cancel", booking["id"].as_str().unwrap());
    let (status, cancelled) = app.post_empty(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = app
        .book_item(&token, &camera, 1, "2031-10-11", "2031-10-12")
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Cancelling twice is not a transition.
    let (status, body) = app.post_empty(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn concurrent_requests_for_the_last_unit_admit_one() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 1, 2500).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let router = app.router.clone();
            let token = token.clone();
            let camera = camera.clone();
            tokio::spawn(async move {
                let body = json!({
                    "lines": [{
                        "item_id": camera,
                        "quantity": 1,
                        "start_date": "2031-10-10",
                        "end_date": "2031-10-12"
                    }]
                });
                let request = axum::http::Request::builder()
                    .method("POST")
                    .uri("/bookings")
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body.to_string()))
                    .unwrap();
                tower::ServiceExt::oneshot(router, request)
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::CONFLICT);
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn customers_only_see_their_own_bookings() {
    let app = TestApp::spawn().await;
    let (asha, _) = app.register_customer("asha@example.com").await;
    let (ravi, _) = app.register_customer("ravi@example.com").await;
    let camera = app.create_item("Sony FX3", 5, 2500).await;

    let (_, booking) = app
        .book_item(&asha, &camera, 1, "2031-10-10", "2031-10-12")
        .await;
    app.book_item(&ravi, &camera, 1, "2031-10-10", "2031-10-12")
        .await;

    let uri = format!("/bookings/{}", booking["id"].as_str().unwrap());
    let (status, _) = app.get(&uri, Some(&ravi)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let by_reference = format!(
        "/bookings/reference/{}",
        booking["reference"].as_str().unwrap()
    );
    let (status, fetched) = app.get(&by_reference, Some(&asha)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], booking["id"]);

    let (_, mine) = app.get("/bookings", Some(&asha)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, all) = app.get("/bookings", app.admin()).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, pending) = app.get("/bookings?status=cancelled", app.admin()).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;

    let (status, _) = app
        .post(
            "/inventory",
            Some(&token),
            json!({
                "name": "Sony FX3",
                "category": "equipment",
                "total_quantity": 1,
                "price_per_day": 2500
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/bookings", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rental_can_only_complete_after_it_ends() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 2, 2500).await;

    let future = app
        .paid_booking(&token, &camera, "2031-10-10", "2031-10-12")
        .await;
    assert_eq!(future["status"], "confirmed");
    let uri = format!("/bookings/{}/complete", future["id"].as_str().unwrap());
    let (status, body) = app.post_empty(&uri, app.admin()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let past = app
        .paid_booking(&token, &camera, "2020-01-10", "2020-01-12")
        .await;
    let uri = format!("/bookings/{}/complete", past["id"].as_str().unwrap());
    let (status, body) = app.post_empty(&uri, app.admin()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "completed");
    assert!(body["completed_utc"].is_string());
}

#[tokio::test]
async fn admin_confirms_and_edits_booking() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 1, 2500).await;
    let (_, booking) = app
        .book_item(&token, &camera, 1, "2031-10-10", "2031-10-12")
        .await;
    let id = booking["id"].as_str().unwrap();

    let (status, confirmed) = app
        .post_empty(&format!("/bookings/{}/confirm", id), app.admin())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");
    assert_eq!(confirmed["payment_status"], "pending");

    let (status, edited) = app
        .request(
            axum::http::Method::PATCH,
            &format!("/bookings/{}", id),
            app.admin(),
            Some(json!({ "notes": "Pickup at 9am", "customer_phone": "+91-9811111111" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["notes"], "Pickup at 9am");
    assert_eq!(edited["customer"]["phone"], "+91-9811111111");
    assert_eq!(edited["status"], "confirmed");
}

#[tokio::test]
async fn new_booking_notifies_admins_and_emails_customer() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register_customer("asha@example.com").await;
    let camera = app.create_item("Sony FX3", 1, 2500).await;

    let (_, booking) = app
        .book_item(&token, &camera, 1, "2031-10-10", "2031-10-12")
        .await;

    let (status, inbox) = app.get("/notifications", app.admin()).await;
    assert_eq!(status, StatusCode::OK);
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["kind"], "booking_created");
    assert_eq!(inbox[0]["booking_id"], booking["id"]);

    let sent = app.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "asha@example.com");
    assert!(sent[0]
        .subject
        .contains(booking["reference"].as_str().unwrap()));
}
