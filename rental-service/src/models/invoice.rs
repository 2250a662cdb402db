use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Customer, PaymentState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub days: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Billing document for a paid booking. At most one exists per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub invoice_number: String,
    pub booking_id: String,
    pub booking_reference: String,
    pub user_id: String,
    pub customer: Customer,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub payment_status: PaymentState,
    pub created_utc: DateTime<Utc>,
}

impl Invoice {
    /// `INV-YYYYMMDD-XXXX` with a random four digit suffix.
    pub fn generate_number(issue_date: NaiveDate) -> String {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        format!("INV-{}-{:04}", issue_date.format("%Y%m%d"), suffix)
    }
}
