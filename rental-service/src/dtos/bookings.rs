use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::BookingStatus;

/// One requested line: exactly one of `item_id` / `package_id`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineRequest {
    pub item_id: Option<String>,
    pub package_id: Option<String>,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "At least one line is required"), nested)]
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Serialize)]
pub struct QuoteLine {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub price_per_day: Decimal,
    pub subtotal: Decimal,
    /// Units (or whole packages) still free over the line's dates.
    pub remaining: u32,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub lines: Vec<QuoteLine>,
    pub total: Decimal,
    pub currency: String,
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    /// Defaults to the caller's own profile.
    #[validate(nested)]
    pub customer: Option<CustomerRequest>,
    #[validate(length(min = 1, message = "At least one line is required"), nested)]
    pub lines: Vec<LineRequest>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Admin edits that do not touch dates, lines or state.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,
    #[validate(length(max = 32))]
    pub customer_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
}
