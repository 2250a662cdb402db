use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{
    respond_all, BookingListQuery, BookingResponse, CreateBookingRequest, PaymentResponse,
    UpdateBookingRequest,
};
use crate::middleware::{AdminUser, AuthUser};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

pub async fn create_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state.bookings.create_booking(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.list(&user, query.status).await?;
    Ok(Json(respond_all(bookings)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    Ok(Json(state.bookings.get_for(&user, &id).await?.into()))
}

pub async fn get_booking_by_reference(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reference): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.get_by_reference(&user, &reference).await?;
    Ok(Json(booking.into()))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    Ok(Json(state.bookings.cancel(&user, &id).await?.into()))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    Ok(Json(state.bookings.confirm(&id).await?.into()))
}

pub async fn complete_booking(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    Ok(Json(state.bookings.complete(&id).await?.into()))
}

/// Notes and customer contact only; dates, lines and state are not editable.
pub async fn update_booking(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    Ok(Json(state.bookings.update(&id, payload).await?.into()))
}

pub async fn list_booking_payments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let payments = state.payments.list_for_booking(&user, &id).await?;
    Ok(Json(respond_all(payments)))
}
