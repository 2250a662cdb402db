use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{CreatePaymentRequest, NoteRequest, PaymentResponse, PaymentStatusRequest};
use crate::middleware::{AdminUser, AuthUser};
use crate::utils::validation::{OptionalJson, ValidatedJson};
use crate::AppState;

pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let payment = state.payments.process_payment(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

pub async fn complete_payment(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, AppError> {
    Ok(Json(state.payments.complete_payment(&id).await?.into()))
}

pub async fn fail_payment(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<NoteRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    Ok(Json(state.payments.fail_payment(&id, payload.note).await?.into()))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<PaymentStatusRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    tracing::info!(
        payment_id = %id,
        admin_id = %admin.sub,
        status = payload.status.as_str(),
        "Payment status correction"
    );
    let payment = state
        .payments
        .correct_status(&id, payload.status, payload.note)
        .await?;
    Ok(Json(payment.into()))
}
