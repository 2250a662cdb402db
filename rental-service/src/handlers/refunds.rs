use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{respond_all, ApproveRefundRequest, CreateRefundRequest, NoteRequest, RefundResponse};
use crate::middleware::{AdminUser, AuthUser};
use crate::utils::validation::{OptionalJson, ValidatedJson};
use crate::AppState;

pub async fn request_refund(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateRefundRequest>,
) -> Result<(StatusCode, Json<RefundResponse>), AppError> {
    let refund = state.refunds.request(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(refund.into())))
}

/// Customers see their own refunds; admins see all of them.
pub async fn list_refunds(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<RefundResponse>>, AppError> {
    Ok(Json(respond_all(state.refunds.list(&user).await?)))
}

pub async fn get_refund(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RefundResponse>, AppError> {
    Ok(Json(state.refunds.get_for(&user, &id).await?.into()))
}

pub async fn cancel_refund(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RefundResponse>, AppError> {
    Ok(Json(state.refunds.cancel(&user, &id).await?.into()))
}

pub async fn approve_refund(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<ApproveRefundRequest>,
) -> Result<Json<RefundResponse>, AppError> {
    Ok(Json(state.refunds.approve(&id, payload).await?.into()))
}

pub async fn reject_refund(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    OptionalJson(payload): OptionalJson<NoteRequest>,
) -> Result<Json<RefundResponse>, AppError> {
    Ok(Json(state.refunds.reject(&id, payload).await?.into()))
}

pub async fn process_refund(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<RefundResponse>, AppError> {
    Ok(Json(state.refunds.process(&id).await?.into()))
}
