//! Persistence for every rental entity.
//!
//! [`MongoStore`] is the production backend; [`MemoryStore`] backs tests and
//! `STORAGE=memory`. Both guarantee that [`RentalStore::insert_booking_checked`] never
//! oversells an item, even under concurrent requests.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Booking, BookingStatus, DateRange, InventoryItem, Invoice, Notification,
    Package, Payment, PaymentStatus, Refund, RefundStatus, Reservation, User,
};
use crate::services::RentalError;

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub user_id: Option<String>,
    pub status: Option<BookingStatus>,
}

#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn health_check(&self) -> Result<(), RentalError>;

    // Users
    async fn insert_user(&self, user: &User) -> Result<(), RentalError>;
    async fn find_user(&self, id: &str) -> Result<Option<User>, RentalError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RentalError>;
    async fn list_admins(&self) -> Result<Vec<User>, RentalError>;

    // Catalog
    async fn insert_item(&self, item: &InventoryItem) -> Result<(), RentalError>;
    async fn find_item(&self, id: &str) -> Result<Option<InventoryItem>, RentalError>;
    async fn list_items(&self, include_retired: bool) -> Result<Vec<InventoryItem>, RentalError>;
    async fn update_item(&self, item: &InventoryItem) -> Result<(), RentalError>;
    async fn insert_package(&self, package: &Package) -> Result<(), RentalError>;
    async fn find_package(&self, id: &str) -> Result<Option<Package>, RentalError>;
    async fn list_packages(&self, include_retired: bool) -> Result<Vec<Package>, RentalError>;
    async fn update_package(&self, package: &Package) -> Result<(), RentalError>;

    // Bookings
    /// Reservations on `item_id` from non-cancelled bookings that intersect `range`.
    async fn overlapping_reservations(
        &self,
        item_id: &str,
        range: &DateRange,
    ) -> Result<Vec<Reservation>, RentalError>;

    /// Insert `booking` only if every reserved item still has stock for it.
    async fn insert_booking_checked(&self, booking: &Booking) -> Result<(), RentalError>;

    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, RentalError>;
    async fn find_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, RentalError>;
    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RentalError>;

    /// Replace `booking` if the stored copy is still at `expected_version`. Returns `false`
    /// otherwise.
    async fn replace_booking_if(
        &self,
        booking: &Booking,
        expected_version: i64,
    ) -> Result<bool, RentalError>;

    // Payments
    async fn insert_payment(&self, payment: &Payment) -> Result<(), RentalError>;
    async fn find_payment(&self, id: &str) -> Result<Option<Payment>, RentalError>;
    async fn list_payments_for_booking(&self, booking_id: &str)
        -> Result<Vec<Payment>, RentalError>;
    async fn replace_payment_if(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, RentalError>;

    // Invoices
    /// Insert unless the booking already has one; returns the stored invoice either way.
    async fn insert_invoice_once(&self, invoice: &Invoice) -> Result<Invoice, RentalError>;
    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, RentalError>;
    async fn find_invoice_by_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Invoice>, RentalError>;
    async fn list_invoices(&self) -> Result<Vec<Invoice>, RentalError>;

    // Refunds
    async fn insert_refund(&self, refund: &Refund) -> Result<(), RentalError>;
    async fn find_refund(&self, id: &str) -> Result<Option<Refund>, RentalError>;
    async fn list_refunds(&self, user_id: Option<&str>) -> Result<Vec<Refund>, RentalError>;
    async fn list_refunds_for_booking(&self, booking_id: &str)
        -> Result<Vec<Refund>, RentalError>;
    async fn replace_refund_if(
        &self,
        refund: &Refund,
        expected: RefundStatus,
    ) -> Result<bool, RentalError>;

    // Notifications
    async fn insert_notifications(&self, notifications: &[Notification])
        -> Result<(), RentalError>;
    async fn list_notifications(
        &self,
        admin_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RentalError>;
    async fn count_unread(&self, admin_id: &str) -> Result<u64, RentalError>;
    /// Set the read flag on one notification. Already-read notifications are left untouched.
    async fn mark_notification_read(
        &self,
        id: &str,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, RentalError>;
    async fn mark_all_read(&self, admin_id: &str, now: DateTime<Utc>) -> Result<u64, RentalError>;
}
