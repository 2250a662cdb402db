use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, to_document, Document},
    error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{
        ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
    },
    ClientSession, Client, Collection, IndexModel,
};

use super::{BookingFilter, RentalStore};
use crate::models::{
    Booking, DateRange, InventoryItem, Invoice, Notification, Package, Payment,
    PaymentStatus, Refund, RefundStatus, Reservation, User,
};
use crate::services::{availability, RentalError};

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    users: Collection<User>,
    items: Collection<InventoryItem>,
    packages: Collection<Package>,
    bookings: Collection<Booking>,
    payments: Collection<Payment>,
    invoices: Collection<Invoice>,
    refunds: Collection<Refund>,
    notifications: Collection<Notification>,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
        ErrorKind::Command(e) => e.code == 11000,
        _ => false,
    }
}

/// Transaction aborted because another writer touched the same documents.
fn is_write_conflict(err: &mongodb::error::Error) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
        || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
}

fn booking_conflict() -> RentalError {
    RentalError::Conflict(
        "another booking for the same item was being saved; please retry".to_string(),
    )
}

fn bson_error(err: impl std::error::Error + Send + Sync + 'static) -> RentalError {
    RentalError::Internal(anyhow::Error::new(err))
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_utc": -1 }).build()
}

/// Non-cancelled bookings with a reservation on `item_id` intersecting `range`.
///
/// Dates are stored as ISO `YYYY-MM-DD` strings, which order the same as the dates.
fn overlap_filter(item_id: &str, range: &DateRange) -> Document {
    doc! {
        "state.status": { "$ne": "cancelled" },
        "reservations": {
            "$elemMatch": {
                "item_id": item_id,
                "start_date": { "$lt": range.end.to_string() },
                "end_date": { "$gt": range.start.to_string() },
            }
        }
    }
}

fn reservations_on(bookings: Vec<Booking>, item_id: &str, range: &DateRange) -> Vec<Reservation> {
    bookings
        .into_iter()
        .flat_map(|b| b.reservations.into_iter())
        .filter(|r| r.item_id == item_id && r.range().overlaps(range))
        .collect()
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, RentalError> {
        let mut client_options = ClientOptions::parse(uri).await?;
        client_options.app_name = Some("rental-service".to_string());
        let client = Client::with_options(client_options)?;
        Ok(Self::new(client, database))
    }

    pub fn new(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self {
            users: db.collection("users"),
            items: db.collection("inventory"),
            packages: db.collection("packages"),
            bookings: db.collection("bookings"),
            payments: db.collection("payments"),
            invoices: db.collection("invoices"),
            refunds: db.collection("refunds"),
            notifications: db.collection("notifications"),
            client,
        }
    }

    pub async fn init_indexes(&self) -> Result<(), RentalError> {
        let unique = |name: &str| {
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build()
        };
        let named = |name: &str| IndexOptions::builder().name(name.to_string()).build();

        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique("user_email_idx"))
                    .build(),
                None,
            )
            .await?;

        self.bookings
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "reference": 1 })
                        .options(unique("booking_reference_idx"))
                        .build(),
                    IndexModel::builder()
                        .keys(doc! {
                            "reservations.item_id": 1,
                            "reservations.start_date": 1,
                            "reservations.end_date": 1,
                        })
                        .options(named("booking_reservation_idx"))
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_utc": -1 })
                        .options(named("booking_user_idx"))
                        .build(),
                ],
                None,
            )
            .await?;

        self.payments
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "booking_id": 1 })
                    .options(named("payment_booking_idx"))
                    .build(),
                None,
            )
            .await?;

        self.invoices
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "booking_id": 1 })
                        .options(unique("invoice_booking_idx"))
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "invoice_number": 1 })
                        .options(unique("invoice_number_idx"))
                        .build(),
                ],
                None,
            )
            .await?;

        self.refunds
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "booking_id": 1 })
                        .options(named("refund_booking_idx"))
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_utc": -1 })
                        .options(named("refund_user_idx"))
                        .build(),
                ],
                None,
            )
            .await?;

        self.notifications
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "admin_id": 1, "read": 1, "created_utc": -1 })
                    .options(named("notification_admin_idx"))
                    .build(),
                None,
            )
            .await?;

        tracing::info!("Rental service indexes initialized");
        Ok(())
    }

    /// Availability check and insert inside `session`'s transaction.
    ///
    /// Every reserved item's `version` is incremented first, so a concurrent transaction
    /// reserving the same item hits a write conflict instead of reading stale bookings.
    async fn check_and_insert(
        &self,
        booking: &Booking,
        session: &mut ClientSession,
    ) -> Result<(), RentalError> {
        for (item_id, requested) in availability::by_item(&booking.reservations) {
            let item = self
                .items
                .find_one_and_update_with_session(
                    doc! { "_id": item_id },
                    doc! { "$inc": { "version": 1_i64 } },
                    FindOneAndUpdateOptions::builder()
                        .return_document(ReturnDocument::After)
                        .build(),
                    session,
                )
                .await?
                .ok_or_else(|| RentalError::not_found("inventory item", item_id))?;

            let span = availability::span(&requested);
            let mut cursor = self
                .bookings
                .find_with_session(overlap_filter(item_id, &span), None, session)
                .await?;
            let overlapping: Vec<Booking> = cursor.stream(session).try_collect().await?;
            let existing = reservations_on(overlapping, item_id, &span);

            availability::check_item(&item, &existing, &requested)?;
        }

        self.bookings
            .insert_one_with_session(booking, None, session)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    RentalError::DuplicateReference(booking.reference.clone())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }
}

#[async_trait]
impl RentalStore for MongoStore {
    async fn health_check(&self) -> Result<(), RentalError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), RentalError> {
        self.users.insert_one(user, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                RentalError::EmailAlreadyRegistered
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, RentalError> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RentalError> {
        Ok(self
            .users
            .find_one(doc! { "email": email.to_lowercase() }, None)
            .await?)
    }

    async fn list_admins(&self) -> Result<Vec<User>, RentalError> {
        let cursor = self.users.find(doc! { "role": "admin" }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_item(&self, item: &InventoryItem) -> Result<(), RentalError> {
        self.items.insert_one(item, None).await?;
        Ok(())
    }

    async fn find_item(&self, id: &str) -> Result<Option<InventoryItem>, RentalError> {
        Ok(self.items.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_items(&self, include_retired: bool) -> Result<Vec<InventoryItem>, RentalError> {
        let filter = if include_retired {
            doc! {}
        } else {
            doc! { "status": "active" }
        };
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.items.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_item(&self, item: &InventoryItem) -> Result<(), RentalError> {
        let mut fields = to_document(item).map_err(bson_error)?;
        fields.remove("_id");
        // Owned by booking transactions.
        fields.remove("version");

        let result = self
            .items
            .update_one(doc! { "_id": &item.id }, doc! { "$set": fields }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(RentalError::not_found("inventory item", &item.id));
        }
        Ok(())
    }

    async fn insert_package(&self, package: &Package) -> Result<(), RentalError> {
        self.packages.insert_one(package, None).await?;
        Ok(())
    }

    async fn find_package(&self, id: &str) -> Result<Option<Package>, RentalError> {
        Ok(self.packages.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_packages(&self, include_retired: bool) -> Result<Vec<Package>, RentalError> {
        let filter = if include_retired {
            doc! {}
        } else {
            doc! { "status": "active" }
        };
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.packages.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_package(&self, package: &Package) -> Result<(), RentalError> {
        let result = self
            .packages
            .replace_one(doc! { "_id": &package.id }, package, None)
            .await?;
        if result.matched_count == 0 {
            return Err(RentalError::not_found("package", &package.id));
        }
        Ok(())
    }

    async fn overlapping_reservations(
        &self,
        item_id: &str,
        range: &DateRange,
    ) -> Result<Vec<Reservation>, RentalError> {
        let cursor = self
            .bookings
            .find(overlap_filter(item_id, range), None)
            .await?;
        let bookings: Vec<Booking> = cursor.try_collect().await?;
        Ok(reservations_on(bookings, item_id, range))
    }

    async fn insert_booking_checked(&self, booking: &Booking) -> Result<(), RentalError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        if let Err(err) = self.check_and_insert(booking, &mut session).await {
            if let Err(abort_err) = session.abort_transaction().await {
                tracing::warn!(error = %abort_err, "Failed to abort booking transaction");
            }
            return Err(match err {
                RentalError::Database(e) if is_write_conflict(&e) => booking_conflict(),
                other => other,
            });
        }

        session.commit_transaction().await.map_err(|e| {
            if is_write_conflict(&e) {
                booking_conflict()
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, RentalError> {
        Ok(self.bookings.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, RentalError> {
        Ok(self
            .bookings
            .find_one(doc! { "reference": reference }, None)
            .await?)
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RentalError> {
        let mut query = doc! {};
        if let Some(user_id) = &filter.user_id {
            query.insert("user_id", user_id);
        }
        if let Some(status) = filter.status {
            query.insert("state.status", status.as_str());
        }
        let cursor = self.bookings.find(query, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_booking_if(
        &self,
        booking: &Booking,
        expected_version: i64,
    ) -> Result<bool, RentalError> {
        let result = self
            .bookings
            .replace_one(
                doc! { "_id": &booking.id, "version": expected_version },
                booking,
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), RentalError> {
        self.payments.insert_one(payment, None).await?;
        Ok(())
    }

    async fn find_payment(&self, id: &str) -> Result<Option<Payment>, RentalError> {
        Ok(self.payments.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_payments_for_booking(
        &self,
        booking_id: &str,
    ) -> Result<Vec<Payment>, RentalError> {
        let cursor = self
            .payments
            .find(doc! { "booking_id": booking_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_payment_if(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, RentalError> {
        let result = self
            .payments
            .replace_one(
                doc! { "_id": &payment.id, "status": expected.as_str() },
                payment,
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_invoice_once(&self, invoice: &Invoice) -> Result<Invoice, RentalError> {
        match self.invoices.insert_one(invoice, None).await {
            Ok(_) => Ok(invoice.clone()),
            Err(e) if is_duplicate_key(&e) => self
                .find_invoice_by_booking(&invoice.booking_id)
                .await?
                .ok_or_else(|| {
                    // Invoice number collision rather than an existing invoice.
                    RentalError::Conflict(format!(
                        "invoice number {} already in use",
                        invoice.invoice_number
                    ))
                }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, RentalError> {
        Ok(self.invoices.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_invoice_by_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Invoice>, RentalError> {
        Ok(self
            .invoices
            .find_one(doc! { "booking_id": booking_id }, None)
            .await?)
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, RentalError> {
        let cursor = self.invoices.find(doc! {}, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_refund(&self, refund: &Refund) -> Result<(), RentalError> {
        self.refunds.insert_one(refund, None).await?;
        Ok(())
    }

    async fn find_refund(&self, id: &str) -> Result<Option<Refund>, RentalError> {
        Ok(self.refunds.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_refunds(&self, user_id: Option<&str>) -> Result<Vec<Refund>, RentalError> {
        let filter = match user_id {
            Some(user_id) => doc! { "user_id": user_id },
            None => doc! {},
        };
        let cursor = self.refunds.find(filter, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_refunds_for_booking(&self, booking_id: &str) -> Result<Vec<Refund>, RentalError> {
        let cursor = self
            .refunds
            .find(doc! { "booking_id": booking_id }, newest_first())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_refund_if(
        &self,
        refund: &Refund,
        expected: RefundStatus,
    ) -> Result<bool, RentalError> {
        let result = self
            .refunds
            .replace_one(
                doc! { "_id": &refund.id, "status": expected.as_str() },
                refund,
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_notifications(
        &self,
        notifications: &[Notification],
    ) -> Result<(), RentalError> {
        if notifications.is_empty() {
            return Ok(());
        }
        self.notifications.insert_many(notifications, None).await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        admin_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RentalError> {
        let mut filter = doc! { "admin_id": admin_id };
        if unread_only {
            filter.insert("read", false);
        }
        let cursor = self.notifications.find(filter, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_unread(&self, admin_id: &str) -> Result<u64, RentalError> {
        Ok(self
            .notifications
            .count_documents(doc! { "admin_id": admin_id, "read": false }, None)
            .await?)
    }

    async fn mark_notification_read(
        &self,
        id: &str,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, RentalError> {
        let read_utc = to_bson(&now).map_err(bson_error)?;
        let updated = self
            .notifications
            .find_one_and_update(
                doc! { "_id": id, "admin_id": admin_id, "read": false },
                doc! { "$set": { "read": true, "read_utc": read_utc } },
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;

        match updated {
            Some(n) => Ok(Some(n)),
            // Already read, or not this admin's.
            None => Ok(self
                .notifications
                .find_one(doc! { "_id": id, "admin_id": admin_id }, None)
                .await?),
        }
    }

    async fn mark_all_read(&self, admin_id: &str, now: DateTime<Utc>) -> Result<u64, RentalError> {
        let read_utc = to_bson(&now).map_err(bson_error)?;
        let result = self
            .notifications
            .update_many(
                doc! { "admin_id": admin_id, "read": false },
                doc! { "$set": { "read": true, "read_utc": read_utc } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn overlap_filter_uses_half_open_bounds() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2031, 10, 11).unwrap(),
            NaiveDate::from_ymd_opt(2031, 10, 13).unwrap(),
        )
        .unwrap();
        let filter = overlap_filter("cam-1", &range);

        let elem = filter
            .get_document("reservations")
            .unwrap()
            .get_document("$elemMatch")
            .unwrap();
        assert_eq!(
            elem.get_document("start_date").unwrap().get_str("$lt").unwrap(),
            "2031-10-13"
        );
        assert_eq!(
            elem.get_document("end_date").unwrap().get_str("$gt").unwrap(),
            "2031-10-11"
        );
    }
}
