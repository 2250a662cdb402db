use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{BookingFilter, RentalStore};
use crate::models::{
    Booking, DateRange, InventoryItem, Invoice, Notification, Package, Payment,
    PaymentStatus, Refund, RefundStatus, Reservation, Role, User,
};
use crate::services::{availability, RentalError};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    items: HashMap<String, InventoryItem>,
    packages: HashMap<String, Package>,
    bookings: HashMap<String, Booking>,
    payments: HashMap<String, Payment>,
    invoices: HashMap<String, Invoice>,
    refunds: HashMap<String, Refund>,
    notifications: HashMap<String, Notification>,
}

impl Tables {
    fn overlapping(&self, item_id: &str, range: &DateRange) -> Vec<Reservation> {
        self.bookings
            .values()
            .filter(|b| b.state.status.reserves_stock())
            .flat_map(|b| b.reservations.iter())
            .filter(|r| r.item_id == item_id && r.range().overlaps(range))
            .cloned()
            .collect()
    }
}

/// Process-local store. Every write takes the single table lock, so a booking's
/// availability check and its insert can never interleave with another booking.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created(row)));
    rows
}

#[async_trait]
impl RentalStore for MemoryStore {
    async fn health_check(&self) -> Result<(), RentalError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), RentalError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RentalError::EmailAlreadyRegistered);
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, RentalError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RentalError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_admins(&self) -> Result<Vec<User>, RentalError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .filter(|u| u.role == Role::Admin)
            .cloned()
            .collect())
    }

    async fn insert_item(&self, item: &InventoryItem) -> Result<(), RentalError> {
        self.tables
            .write()
            .await
            .items
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn find_item(&self, id: &str) -> Result<Option<InventoryItem>, RentalError> {
        Ok(self.tables.read().await.items.get(id).cloned())
    }

    async fn list_items(&self, include_retired: bool) -> Result<Vec<InventoryItem>, RentalError> {
        let tables = self.tables.read().await;
        let mut items: Vec<InventoryItem> = tables
            .items
            .values()
            .filter(|i| include_retired || i.is_active())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_item(&self, item: &InventoryItem) -> Result<(), RentalError> {
        let mut tables = self.tables.write().await;
        match tables.items.get_mut(&item.id) {
            Some(stored) => {
                // Keep the concurrency counter owned by booking inserts.
                let version = stored.version;
                *stored = item.clone();
                stored.version = version;
                Ok(())
            }
            None => Err(RentalError::not_found("inventory item", &item.id)),
        }
    }

    async fn insert_package(&self, package: &Package) -> Result<(), RentalError> {
        self.tables
            .write()
            .await
            .packages
            .insert(package.id.clone(), package.clone());
        Ok(())
    }

    async fn find_package(&self, id: &str) -> Result<Option<Package>, RentalError> {
        Ok(self.tables.read().await.packages.get(id).cloned())
    }

    async fn list_packages(&self, include_retired: bool) -> Result<Vec<Package>, RentalError> {
        let tables = self.tables.read().await;
        let mut packages: Vec<Package> = tables
            .packages
            .values()
            .filter(|p| include_retired || p.is_active())
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    async fn update_package(&self, package: &Package) -> Result<(), RentalError> {
        let mut tables = self.tables.write().await;
        match tables.packages.get_mut(&package.id) {
            Some(stored) => {
                *stored = package.clone();
                Ok(())
            }
            None => Err(RentalError::not_found("package", &package.id)),
        }
    }

    async fn overlapping_reservations(
        &self,
        item_id: &str,
        range: &DateRange,
    ) -> Result<Vec<Reservation>, RentalError> {
        Ok(self.tables.read().await.overlapping(item_id, range))
    }

    async fn insert_booking_checked(&self, booking: &Booking) -> Result<(), RentalError> {
        let mut tables = self.tables.write().await;

        if tables
            .bookings
            .values()
            .any(|b| b.reference == booking.reference)
        {
            return Err(RentalError::DuplicateReference(booking.reference.clone()));
        }

        for (item_id, requested) in availability::by_item(&booking.reservations) {
            let item = tables
                .items
                .get(item_id)
                .ok_or_else(|| RentalError::not_found("inventory item", item_id))?;
            let existing = tables.overlapping(item_id, &availability::span(&requested));
            availability::check_item(item, &existing, &requested)?;
        }

        for item_id in availability::by_item(&booking.reservations).keys() {
            if let Some(item) = tables.items.get_mut(*item_id) {
                item.version += 1;
            }
        }
        tables.bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, RentalError> {
        Ok(self.tables.read().await.bookings.get(id).cloned())
    }

    async fn find_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, RentalError> {
        Ok(self
            .tables
            .read()
            .await
            .bookings
            .values()
            .find(|b| b.reference == reference)
            .cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RentalError> {
        let tables = self.tables.read().await;
        let rows = tables
            .bookings
            .values()
            .filter(|b| filter.user_id.as_deref().map_or(true, |u| b.user_id == u))
            .filter(|b| filter.status.map_or(true, |s| b.state.status == s))
            .cloned()
            .collect();
        Ok(newest_first(rows, |b: &Booking| b.created_utc))
    }

    async fn replace_booking_if(
        &self,
        booking: &Booking,
        expected_version: i64,
    ) -> Result<bool, RentalError> {
        let mut tables = self.tables.write().await;
        match tables.bookings.get_mut(&booking.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = booking.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RentalError::not_found("booking", &booking.id)),
        }
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), RentalError> {
        self.tables
            .write()
            .await
            .payments
            .insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn find_payment(&self, id: &str) -> Result<Option<Payment>, RentalError> {
        Ok(self.tables.read().await.payments.get(id).cloned())
    }

    async fn list_payments_for_booking(
        &self,
        booking_id: &str,
    ) -> Result<Vec<Payment>, RentalError> {
        let tables = self.tables.read().await;
        let rows = tables
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Payment| p.created_utc))
    }

    async fn replace_payment_if(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, RentalError> {
        let mut tables = self.tables.write().await;
        match tables.payments.get_mut(&payment.id) {
            Some(stored) if stored.status == expected => {
                *stored = payment.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RentalError::not_found("payment", &payment.id)),
        }
    }

    async fn insert_invoice_once(&self, invoice: &Invoice) -> Result<Invoice, RentalError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .invoices
            .values()
            .find(|i| i.booking_id == invoice.booking_id)
        {
            return Ok(existing.clone());
        }
        tables.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice.clone())
    }

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, RentalError> {
        Ok(self.tables.read().await.invoices.get(id).cloned())
    }

    async fn find_invoice_by_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Invoice>, RentalError> {
        Ok(self
            .tables
            .read()
            .await
            .invoices
            .values()
            .find(|i| i.booking_id == booking_id)
            .cloned())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, RentalError> {
        let rows = self.tables.read().await.invoices.values().cloned().collect();
        Ok(newest_first(rows, |i: &Invoice| i.created_utc))
    }

    async fn insert_refund(&self, refund: &Refund) -> Result<(), RentalError> {
        self.tables
            .write()
            .await
            .refunds
            .insert(refund.id.clone(), refund.clone());
        Ok(())
    }

    async fn find_refund(&self, id: &str) -> Result<Option<Refund>, RentalError> {
        Ok(self.tables.read().await.refunds.get(id).cloned())
    }

    async fn list_refunds(&self, user_id: Option<&str>) -> Result<Vec<Refund>, RentalError> {
        let tables = self.tables.read().await;
        let rows = tables
            .refunds
            .values()
            .filter(|r| user_id.map_or(true, |u| r.user_id == u))
            .cloned()
            .collect();
        Ok(newest_first(rows, |r: &Refund| r.created_utc))
    }

    async fn list_refunds_for_booking(&self, booking_id: &str) -> Result<Vec<Refund>, RentalError> {
        let tables = self.tables.read().await;
        let rows = tables
            .refunds
            .values()
            .filter(|r| r.booking_id == booking_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |r: &Refund| r.created_utc))
    }

    async fn replace_refund_if(
        &self,
        refund: &Refund,
        expected: RefundStatus,
    ) -> Result<bool, RentalError> {
        let mut tables = self.tables.write().await;
        match tables.refunds.get_mut(&refund.id) {
            Some(stored) if stored.status == expected => {
                *stored = refund.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RentalError::not_found("refund", &refund.id)),
        }
    }

    async fn insert_notifications(
        &self,
        notifications: &[Notification],
    ) -> Result<(), RentalError> {
        let mut tables = self.tables.write().await;
        for n in notifications {
            tables.notifications.insert(n.id.clone(), n.clone());
        }
        Ok(())
    }

    async fn list_notifications(
        &self,
        admin_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RentalError> {
        let tables = self.tables.read().await;
        let rows = tables
            .notifications
            .values()
            .filter(|n| n.admin_id == admin_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        Ok(newest_first(rows, |n: &Notification| n.created_utc))
    }

    async fn count_unread(&self, admin_id: &str) -> Result<u64, RentalError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.admin_id == admin_id && !n.read)
            .count() as u64)
    }

    async fn mark_notification_read(
        &self,
        id: &str,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, RentalError> {
        let mut tables = self.tables.write().await;
        Ok(match tables.notifications.get_mut(id) {
            Some(n) if n.admin_id == admin_id => {
                n.mark_read(now);
                Some(n.clone())
            }
            _ => None,
        })
    }

    async fn mark_all_read(&self, admin_id: &str, now: DateTime<Utc>) -> Result<u64, RentalError> {
        let mut tables = self.tables.write().await;
        let changed = tables
            .notifications
            .values_mut()
            .filter(|n| n.admin_id == admin_id)
            .map(|n| n.mark_read(now))
            .filter(|changed| *changed)
            .count();
        Ok(changed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BookingLine, BookingState, Customer, ItemCategory, ItemStatus, LineTarget,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2031, 10, day).unwrap()
    }

    fn camera(total: u32) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: "cam-1".to_string(),
            name: "Sony FX3".to_string(),
            brand: None,
            model: None,
            description: None,
            category: ItemCategory::Equipment,
            total_quantity: total,
            price_per_day: Decimal::from(2500),
            status: ItemStatus::Active,
            version: 0,
            created_utc: now,
            updated_utc: now,
        }
    }

    fn booking(quantity: u32, start: u32, end: u32) -> Booking {
        let now = Utc::now();
        Booking {
            id: uuid::Uuid::new_v4().to_string(),
            reference: Booking::generate_reference(),
            user_id: "u-1".to_string(),
            customer: Customer {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                phone: None,
            },
            lines: vec![BookingLine {
                target: LineTarget::Item {
                    item_id: "cam-1".to_string(),
                },
                name: "Sony FX3".to_string(),
                quantity,
                start_date: d(start),
                end_date: d(end),
                days: end - start,
                price_per_day: Decimal::from(2500),
                subtotal: Decimal::from(2500 * quantity * (end - start)),
            }],
            reservations: vec![Reservation {
                item_id: "cam-1".to_string(),
                quantity,
                start_date: d(start),
                end_date: d(end),
            }],
            total: Decimal::from(2500 * quantity * (end - start)),
            currency: "INR".to_string(),
            state: BookingState::INITIAL,
            version: 0,
            refunded_amount: Decimal::ZERO,
            refund_ids: Vec::new(),
            notes: None,
            created_utc: now,
            updated_utc: now,
            confirmed_utc: None,
            completed_utc: None,
            cancelled_utc: None,
        }
    }

    #[tokio::test]
    async fn concurrent_bookings_for_last_unit_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        store.insert_item(&camera(1)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_booking_checked(&booking(1, 10, 12)).await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn reused_reference_is_reported_as_duplicate() {
        let store = MemoryStore::new();
        store.insert_item(&camera(2)).await.unwrap();

        let first = booking(1, 10, 12);
        store.insert_booking_checked(&first).await.unwrap();
        let mut second = booking(1, 20, 22);
        second.reference = first.reference.clone();

        let err = store.insert_booking_checked(&second).await.unwrap_err();
        assert!(matches!(err, RentalError::DuplicateReference(r) if r == first.reference));
    }

    #[tokio::test]
    async fn cancelled_bookings_release_stock() {
        let store = MemoryStore::new();
        store.insert_item(&camera(1)).await.unwrap();

        let mut first = booking(1, 10, 12);
        store.insert_booking_checked(&first).await.unwrap();
        assert!(store.insert_booking_checked(&booking(1, 11, 12)).await.is_err());

        first.state = first.state.apply(crate::models::BookingEvent::Cancel).unwrap();
        first.version = 1;
        assert!(store.replace_booking_if(&first, 0).await.unwrap());

        assert!(store.insert_booking_checked(&booking(1, 11, 12)).await.is_ok());
    }

    #[tokio::test]
    async fn stale_update_is_refused() {
        let store = MemoryStore::new();
        store.insert_item(&camera(1)).await.unwrap();
        let original = booking(1, 10, 12);
        store.insert_booking_checked(&original).await.unwrap();

        let mut confirmed = original.clone();
        confirmed.state = confirmed.state.apply(crate::models::BookingEvent::Confirm).unwrap();
        confirmed.version = 1;
        assert!(store.replace_booking_if(&confirmed, 0).await.unwrap());

        // A second writer still holding version 0 loses.
        let mut cancelled = original;
        cancelled.state = cancelled.state.apply(crate::models::BookingEvent::Cancel).unwrap();
        cancelled.version = 1;
        assert!(!store.replace_booking_if(&cancelled, 0).await.unwrap());

        let stored = store.find_booking(&confirmed.id).await.unwrap().unwrap();
        assert_eq!(stored.state, confirmed.state);
    }
}
