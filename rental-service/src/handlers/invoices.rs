use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{respond_all, CreateInvoiceRequest, InvoiceResponse};
use crate::middleware::{AdminUser, AuthUser};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// Issues the invoice, or returns the one already issued for the booking.
pub async fn create_invoice(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let invoice = state
        .invoices
        .create(&user, &payload.booking_reference)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    Ok(Json(state.invoices.get_for(&user, &id).await?.into()))
}

pub async fn get_invoice_by_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reference): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .invoices
        .get_by_booking_reference(&user, &reference)
        .await?;
    Ok(Json(invoice.into()))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    Ok(Json(respond_all(state.invoices.list().await?)))
}
