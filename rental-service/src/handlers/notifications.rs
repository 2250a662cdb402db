//! Admin inbox. Every route here is admin-only and scoped to the caller's own copies.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::{
    respond_all, MarkAllReadResponse, NotificationQuery, NotificationResponse,
    UnreadCountResponse,
};
use crate::middleware::AdminUser;
use crate::AppState;

pub async fn list_notifications(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let notifications = state.notifier.list(&admin.sub, query.unread_only).await?;
    Ok(Json(respond_all(notifications)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let count = state.notifier.unread_count(&admin.sub).await?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, AppError> {
    let notification = state.notifier.mark_read(&id, &admin.sub, Utc::now()).await?;
    Ok(Json(notification.into()))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = state.notifier.mark_all_read(&admin.sub, Utc::now()).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
