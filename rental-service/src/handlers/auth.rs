use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::middleware::AuthUser;
use crate::utils::validation::ValidatedJson;
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth.login(payload).await?))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.auth.get_user(&claims.sub).await?;
    Ok(Json(UserResponse::from(user)))
}
