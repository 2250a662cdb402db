pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::RentalConfig;
use services::{
    AuthService, BookingService, CatalogService, EmailProvider, InvoiceService, JwtService,
    Notifier, PaymentService, RefundService,
};
use store::RentalStore;

pub use startup::Application;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RentalConfig>,
    pub store: Arc<dyn RentalStore>,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub bookings: BookingService,
    pub payments: PaymentService,
    pub refunds: RefundService,
    pub invoices: InvoiceService,
    pub notifier: Notifier,
    pub login_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(
        config: RentalConfig,
        store: Arc<dyn RentalStore>,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt);
        let notifier = Notifier::new(store.clone());
        let policy = config.booking.clone();

        Self {
            auth: AuthService::new(store.clone(), jwt.clone()),
            catalog: CatalogService::new(store.clone(), policy.max_rental_days),
            bookings: BookingService::new(
                store.clone(),
                notifier.clone(),
                email.clone(),
                policy.clone(),
            ),
            payments: PaymentService::new(store.clone(), notifier.clone(), email.clone()),
            refunds: RefundService::new(store.clone(), notifier.clone(), email),
            invoices: InvoiceService::new(store.clone(), policy.invoice_due_days),
            login_limiter: create_ip_rate_limiter(
                config.login_rate_limit.attempts,
                config.login_rate_limit.window_seconds,
            ),
            notifier,
            jwt,
            store,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{auth, bookings, catalog, invoices, notifications, payments, refunds};

    let login_route = Router::new()
        .route("/auth/login", post(auth::login))
        .layer(from_fn_with_state(
            state.login_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/auth/register", post(auth::register))
        .merge(login_route)
        .route("/inventory", get(catalog::list_items))
        .route("/inventory/:id", get(catalog::get_item))
        .route(
            "/inventory/:id/availability",
            get(catalog::item_availability),
        )
        .route("/packages", get(catalog::list_packages))
        .route("/packages/:id", get(catalog::get_package))
        .route("/availability/quote", post(catalog::quote));

    // Admin-only routes are guarded again by the `AdminUser` extractor in each handler.
    let authenticated_routes = Router::new()
        .route("/auth/me", get(auth::me))
        // Catalog administration
        .route("/inventory", post(catalog::create_item))
        .route(
            "/inventory/:id",
            axum::routing::put(catalog::update_item).delete(catalog::retire_item),
        )
        .route("/packages", post(catalog::create_package))
        .route(
            "/packages/:id",
            axum::routing::put(catalog::update_package).delete(catalog::retire_package),
        )
        // Bookings
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking).patch(bookings::update_booking),
        )
        .route(
            "/bookings/reference/:reference",
            get(bookings::get_booking_by_reference),
        )
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:id/confirm", post(bookings::confirm_booking))
        .route("/bookings/:id/complete", post(bookings::complete_booking))
        .route(
            "/bookings/:id/payments",
            get(bookings::list_booking_payments),
        )
        // Payments
        .route("/payments", post(payments::create_payment))
        .route("/payments/:id/complete", post(payments::complete_payment))
        .route("/payments/:id/fail", post(payments::fail_payment))
        .route(
            "/payments/:id/status",
            patch(payments::update_payment_status),
        )
        // Invoices
        .route(
            "/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route("/invoices/:id", get(invoices::get_invoice))
        .route(
            "/invoices/booking/:reference",
            get(invoices::get_invoice_by_booking),
        )
        // Refunds
        .route(
            "/refunds",
            post(refunds::request_refund).get(refunds::list_refunds),
        )
        .route("/refunds/:id", get(refunds::get_refund))
        .route("/refunds/:id/cancel", post(refunds::cancel_refund))
        .route("/refunds/:id/approve", post(refunds::approve_refund))
        .route("/refunds/:id/reject", post(refunds::reject_refund))
        .route("/refunds/:id/process", post(refunds::process_refund))
        // Admin inbox
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}
