use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::positive_amount;
use crate::models::{ItemCategory, ItemStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: ItemCategory,
    #[validate(range(min = 1, message = "Total quantity must be at least 1"))]
    pub total_quantity: u32,
    #[validate(custom(function = "positive_amount", message = "Price must be positive"))]
    pub price_per_day: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    #[validate(range(min = 1, message = "Total quantity must be at least 1"))]
    pub total_quantity: Option<u32>,
    #[validate(custom(function = "positive_amount", message = "Price must be positive"))]
    pub price_per_day: Option<Decimal>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PackageComponentRequest {
    #[validate(length(min = 1))]
    pub item_id: String,
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Component quantity must be between 1 and 10000"
    ))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "A package needs at least one component"), nested)]
    pub components: Vec<PackageComponentRequest>,
    #[validate(custom(function = "positive_amount", message = "Price must be positive"))]
    pub price_per_day: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePackageRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "A package needs at least one component"), nested)]
    pub components: Option<Vec<PackageComponentRequest>>,
    #[validate(custom(function = "positive_amount", message = "Price must be positive"))]
    pub price_per_day: Option<Decimal>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub include_retired: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ItemAvailabilityResponse {
    pub item_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_quantity: u32,
    pub reserved: u32,
    pub remaining: u32,
    pub requested: u32,
    pub available: bool,
    pub days: u32,
    pub price: Decimal,
}
