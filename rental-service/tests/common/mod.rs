#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rental_service::config::RentalConfig;
use rental_service::services::MockEmailService;
use rental_service::store::{MemoryStore, RentalStore};
use rental_service::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@studio.test";

/// Router over an in-memory store with a recording mailer and a ready admin account.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub email: Arc<MockEmailService>,
    pub admin_token: String,
    pub admin_id: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_email(MockEmailService::new()).await
    }

    pub async fn spawn_with_email(email: MockEmailService) -> Self {
        let store: Arc<dyn RentalStore> = Arc::new(MemoryStore::new());
        let email = Arc::new(email);
        let state = AppState::new(RentalConfig::for_memory(), store, email.clone());

        let admin = state
            .auth
            .create_admin(ADMIN_EMAIL, "admin-password", "Studio Admin")
            .await
            .expect("Failed to create admin");

        Self {
            router: build_router(state.clone()),
            state,
            email,
            admin_token: admin.token.access_token,
            admin_id: admin.user.id,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, None).await
    }

    pub fn admin(&self) -> Option<&str> {
        Some(self.admin_token.as_str())
    }

    /// Registers a customer and returns `(token, user_id)`.
    pub async fn register_customer(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "customer-password",
                    "name": "Asha Rao",
                    "phone": "+91-9800000000"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_item(&self, name: &str, total_quantity: u32, price_per_day: u32) -> String {
        let (status, body) = self
            .post(
                "/inventory",
                self.admin(),
                json!({
                    "name": name,
                    "category": "equipment",
                    "total_quantity": total_quantity,
                    "price_per_day": price_per_day
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn book_item(
        &self,
        token: &str,
        item_id: &str,
        quantity: u32,
        start: &str,
        end: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/bookings",
            Some(token),
            json!({
                "lines": [{
                    "item_id": item_id,
                    "quantity": quantity,
                    "start_date": start,
                    "end_date": end
                }]
            }),
        )
        .await
    }

    /// Books `item_id` and pays by card; returns the paid booking body.
    pub async fn paid_booking(&self, token: &str, item_id: &str, start: &str, end: &str) -> Value {
        let (status, booking) = self.book_item(token, item_id, 1, start, end).await;
        assert_eq!(status, StatusCode::CREATED, "booking failed: {}", booking);

        let (status, payment) = self
            .post(
                "/payments",
                Some(token),
                json!({
                    "booking_id": booking["id"],
                    "method": "card",
                    "amount": booking["total"],
                    "transaction_id": "txn_test_001"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "payment failed: {}", payment);

        let uri = format!("/bookings/{}", booking["id"].as_str().unwrap());
        self.get(&uri, Some(token)).await.1
    }
}
