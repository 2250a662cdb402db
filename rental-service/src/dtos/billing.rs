use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::positive_amount;
use crate::models::{PaymentMethod, PaymentStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "Booking id is required"))]
    pub booking_id: String,
    pub method: PaymentMethod,
    #[validate(custom(function = "positive_amount", message = "Amount must be positive"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 200))]
    pub transaction_id: Option<String>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentStatusRequest {
    pub status: PaymentStatus,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, message = "Booking reference is required"))]
    pub booking_reference: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRefundRequest {
    #[validate(length(min = 1, message = "Booking id is required"))]
    pub booking_id: String,
    #[validate(custom(function = "positive_amount", message = "Amount must be positive"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 1000, message = "Reason is required"))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApproveRefundRequest {
    #[validate(custom(function = "positive_amount", message = "Amount must be positive"))]
    pub amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// Optional admin remark, used when rejecting a refund or failing a payment.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
