//! Inventory, packages and availability lookups.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{
    respond_all, AvailabilityQuery, CatalogQuery, CreateItemRequest, CreatePackageRequest,
    ItemAvailabilityResponse, ItemResponse, PackageResponse, QuoteRequest, QuoteResponse,
    UpdateItemRequest, UpdatePackageRequest,
};
use crate::middleware::AdminUser;
use crate::utils::validation::ValidatedJson;
use crate::AppState;

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = state.catalog.list_items(query.include_retired).await?;
    Ok(Json(respond_all(items)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    Ok(Json(state.catalog.get_item(&id).await?.into()))
}

pub async fn item_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ItemAvailabilityResponse>, AppError> {
    let response = state
        .catalog
        .item_availability(
            &id,
            query.start_date,
            query.end_date,
            query.quantity.unwrap_or(1),
        )
        .await?;
    Ok(Json(response))
}

pub async fn create_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    let item = state.catalog.create_item(payload).await?;
    tracing::info!(item_id = %item.id, admin_id = %admin.sub, "Inventory item created");
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn update_item(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    Ok(Json(state.catalog.update_item(&id, payload).await?.into()))
}

pub async fn retire_item(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    Ok(Json(state.catalog.retire_item(&id).await?.into()))
}

pub async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<PackageResponse>>, AppError> {
    let packages = state.catalog.list_packages(query.include_retired).await?;
    Ok(Json(respond_all(packages)))
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PackageResponse>, AppError> {
    Ok(Json(state.catalog.get_package(&id).await?.into()))
}

pub async fn create_package(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(payload): ValidatedJson<CreatePackageRequest>,
) -> Result<(StatusCode, Json<PackageResponse>), AppError> {
    let package = state.catalog.create_package(payload).await?;
    tracing::info!(package_id = %package.id, admin_id = %admin.sub, "Package created");
    Ok((StatusCode::CREATED, Json(package.into())))
}

pub async fn update_package(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdatePackageRequest>,
) -> Result<Json<PackageResponse>, AppError> {
    Ok(Json(state.catalog.update_package(&id, payload).await?.into()))
}

pub async fn retire_package(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PackageResponse>, AppError> {
    Ok(Json(state.catalog.retire_package(&id).await?.into()))
}

/// Price and stock check for a whole prospective booking. Writes nothing.
pub async fn quote(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    Ok(Json(state.bookings.quote(&payload).await?))
}
