//! JSON views of stored documents. Storage keys (`_id`, `version`, reservations) stay
//! internal.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{
    Booking, BookingLine, BookingStatus, Customer, InventoryItem, Invoice, InvoiceLine,
    ItemCategory, ItemStatus, Notification, NotificationKind, Package, PackageComponent,
    Payment, PaymentMethod, PaymentState, PaymentStatus, Refund, RefundStatus,
};

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: ItemCategory,
    pub total_quantity: u32,
    pub price_per_day: Decimal,
    pub status: ItemStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<InventoryItem> for ItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            brand: item.brand,
            model: item.model,
            description: item.description,
            category: item.category,
            total_quantity: item.total_quantity,
            price_per_day: item.price_per_day,
            status: item.status,
            created_utc: item.created_utc,
            updated_utc: item.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub components: Vec<PackageComponent>,
    pub price_per_day: Decimal,
    pub status: ItemStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Package> for PackageResponse {
    fn from(package: Package) -> Self {
        Self {
            id: package.id,
            name: package.name,
            description: package.description,
            components: package.components,
            price_per_day: package.price_per_day,
            status: package.status,
            created_utc: package.created_utc,
            updated_utc: package.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub reference: String,
    pub user_id: String,
    pub customer: Customer,
    pub lines: Vec<BookingLine>,
    pub total: Decimal,
    pub refunded_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_utc: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            reference: booking.reference,
            user_id: booking.user_id,
            customer: booking.customer,
            lines: booking.lines,
            total: booking.total,
            refunded_amount: booking.refunded_amount,
            currency: booking.currency,
            status: booking.state.status,
            payment_status: booking.state.payment,
            notes: booking.notes,
            created_utc: booking.created_utc,
            updated_utc: booking.updated_utc,
            confirmed_utc: booking.confirmed_utc,
            completed_utc: booking.completed_utc,
            cancelled_utc: booking.cancelled_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_utc: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            booking_id: payment.booking_id,
            method: payment.method,
            transaction_id: payment.transaction_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            note: payment.note,
            created_utc: payment.created_utc,
            updated_utc: payment.updated_utc,
            completed_utc: payment.completed_utc,
            failed_utc: payment.failed_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub invoice_number: String,
    pub booking_id: String,
    pub booking_reference: String,
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

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            booking_id: invoice.booking_id,
            booking_reference: invoice.booking_reference,
            customer: invoice.customer,
            lines: invoice.lines,
            subtotal: invoice.subtotal,
            total: invoice.total,
            currency: invoice.currency,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            payment_status: invoice.payment_status,
            created_utc: invoice.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub id: String,
    pub booking_id: String,
    pub booking_reference: String,
    pub user_id: String,
    pub requested_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_amount: Option<Decimal>,
    pub currency: String,
    pub reason: String,
    pub status: RefundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_utc: Option<DateTime<Utc>>,
}

impl From<Refund> for RefundResponse {
    fn from(refund: Refund) -> Self {
        Self {
            id: refund.id,
            booking_id: refund.booking_id,
            booking_reference: refund.booking_reference,
            user_id: refund.user_id,
            requested_amount: refund.requested_amount,
            approved_amount: refund.approved_amount,
            currency: refund.currency,
            reason: refund.reason,
            status: refund.status,
            admin_note: refund.admin_note,
            created_utc: refund.created_utc,
            updated_utc: refund.updated_utc,
            decided_utc: refund.decided_utc,
            processed_utc: refund.processed_utc,
            cancelled_utc: refund.cancelled_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            booking_id: n.booking_id,
            read: n.read,
            read_utc: n.read_utc,
            created_utc: n.created_utc,
        }
    }
}

/// Convert a list of documents into their response views.
pub fn respond_all<T, R: From<T>>(items: Vec<T>) -> Vec<R> {
    items.into_iter().map(R::from).collect()
}
