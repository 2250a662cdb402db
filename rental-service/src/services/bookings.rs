use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::BookingPolicy;
use crate::dtos::{
    CreateBookingRequest, LineRequest, QuoteLine, QuoteRequest, QuoteResponse,
    UpdateBookingRequest,
};
use crate::models::{
    Booking, BookingEvent, BookingState, BookingStatus, Customer, DateRange, LineTarget,
    NotificationKind, Reservation,
};
use crate::services::availability::{self, PricedLine};
use crate::services::email::{self, EmailProvider};
use crate::services::{metrics, AccessTokenClaims, Notifier, RentalError};
use crate::store::{BookingFilter, RentalStore};

/// Persist `booking`, bumping its version. Fails with a conflict if someone else saved it
/// since it was loaded.
pub async fn save_booking(store: &dyn RentalStore, booking: &mut Booking) -> Result<(), RentalError> {
    let expected = booking.version;
    booking.version += 1;
    if !store.replace_booking_if(booking, expected).await? {
        return Err(RentalError::Conflict(format!(
            "booking {} was modified concurrently; reload and retry",
            booking.reference
        )));
    }
    Ok(())
}

/// Apply `event` to `booking` through the transition table and persist it.
pub async fn transition_booking(
    store: &dyn RentalStore,
    mut booking: Booking,
    event: BookingEvent,
) -> Result<Booking, RentalError> {
    let now = Utc::now();
    let expected = booking.state;
    let next = booking.next_state(event, now.date_naive())?;
    booking.enter(next, now);
    save_booking(store, &mut booking).await?;

    tracing::info!(
        booking_id = %booking.id,
        reference = %booking.reference,
        event = ?event,
        from = %expected,
        to = %next,
        "Booking state changed"
    );
    Ok(booking)
}

const REFERENCE_ATTEMPTS: usize = 3;

/// Insert a new booking, drawing a fresh reference when the random one is taken.
pub(crate) async fn insert_booking(
    store: &dyn RentalStore,
    booking: &mut Booking,
) -> Result<(), RentalError> {
    let mut attempt = 1;
    loop {
        match store.insert_booking_checked(booking).await {
            Ok(()) => return Ok(()),
            Err(RentalError::DuplicateReference(taken)) if attempt < REFERENCE_ATTEMPTS => {
                tracing::warn!(reference = %taken, attempt, "Booking reference taken, drawing another");
                booking.reference = Booking::generate_reference();
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Reject callers that neither own the booking nor are admins.
pub fn ensure_can_access(user: &AccessTokenClaims, booking: &Booking) -> Result<(), RentalError> {
    if user.is_admin() || booking.user_id == user.sub {
        Ok(())
    } else {
        Err(RentalError::Forbidden(
            "You do not have access to this booking".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn RentalStore>,
    notifier: Notifier,
    email: Arc<dyn EmailProvider>,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        notifier: Notifier,
        email: Arc<dyn EmailProvider>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            email,
            policy,
        }
    }

    async fn price_line(&self, req: &LineRequest) -> Result<PricedLine, RentalError> {
        let range = DateRange::bounded(req.start_date, req.end_date, self.policy.max_rental_days)?;

        match (&req.item_id, &req.package_id) {
            (Some(item_id), None) => {
                let item = self
                    .store
                    .find_item(item_id)
                    .await?
                    .ok_or_else(|| RentalError::not_found("inventory item", item_id))?;
                if !item.is_active() {
                    return Err(RentalError::ItemUnavailable(item.name));
                }
                availability::price_item_line(&item, req.quantity, range)
            }
            (None, Some(package_id)) => {
                let package = self
                    .store
                    .find_package(package_id)
                    .await?
                    .ok_or_else(|| RentalError::not_found("package", package_id))?;
                if !package.is_active() {
                    return Err(RentalError::ItemUnavailable(package.name));
                }
                availability::price_package_line(&package, req.quantity, range)
            }
            _ => Err(RentalError::Validation(
                "each line needs exactly one of item_id or package_id".to_string(),
            )),
        }
    }

    async fn price_lines(&self, lines: &[LineRequest]) -> Result<Vec<PricedLine>, RentalError> {
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            priced.push(self.price_line(line).await?);
        }
        Ok(priced)
    }

    /// Whole units of `line` still free, given `earlier` lines of the same request.
    async fn remaining_units(
        &self,
        priced: &PricedLine,
        earlier: &[Reservation],
    ) -> Result<u32, RentalError> {
        let range = priced.line.range();
        let mut units = u32::MAX;

        for r in &priced.reservations {
            let item = match self.store.find_item(&r.item_id).await? {
                Some(item) if item.is_active() => item,
                _ => return Ok(0),
            };
            let mut load = self.store.overlapping_reservations(&item.id, &range).await?;
            load.extend(earlier.iter().filter(|e| e.item_id == item.id).cloned());

            let free = availability::remaining(&item, &load, &range);
            let per_unit = (r.quantity / priced.line.quantity.max(1)).max(1);
            units = units.min(free / per_unit);
        }
        Ok(if units == u32::MAX { 0 } else { units })
    }

    /// Price and availability for a prospective booking. Writes nothing.
    pub async fn quote(&self, req: &QuoteRequest) -> Result<QuoteResponse, RentalError> {
        let priced = self.price_lines(&req.lines).await?;

        let mut lines = Vec::with_capacity(priced.len());
        let mut earlier: Vec<Reservation> = Vec::new();
        let total = availability::total_price(priced.iter().map(|p| &p.line.subtotal))?;

        for p in &priced {
            let remaining = self.remaining_units(p, &earlier).await?;
            let (item_id, package_id) = match &p.line.target {
                LineTarget::Item { item_id } => (Some(item_id.clone()), None),
                LineTarget::Package { package_id } => (None, Some(package_id.clone())),
            };
            lines.push(QuoteLine {
                name: p.line.name.clone(),
                item_id,
                package_id,
                quantity: p.line.quantity,
                start_date: p.line.start_date,
                end_date: p.line.end_date,
                days: p.line.days,
                price_per_day: p.line.price_per_day,
                subtotal: p.line.subtotal,
                remaining,
                available: p.line.quantity <= remaining,
            });
            earlier.extend(p.reservations.iter().cloned());
        }

        Ok(QuoteResponse {
            available: lines.iter().all(|l| l.available),
            lines,
            total,
            currency: self.policy.currency.clone(),
        })
    }

    pub async fn create_booking(
        &self,
        user: &AccessTokenClaims,
        req: CreateBookingRequest,
    ) -> Result<Booking, RentalError> {
        let customer = match req.customer {
            Some(c) => Customer {
                name: c.name,
                email: c.email,
                phone: c.phone,
            },
            None => {
                let profile = self
                    .store
                    .find_user(&user.sub)
                    .await?
                    .ok_or_else(|| RentalError::not_found("user", &user.sub))?;
                Customer {
                    name: profile.name,
                    email: profile.email,
                    phone: profile.phone,
                }
            }
        };

        let priced = self.price_lines(&req.lines).await?;
        let total = availability::total_price(priced.iter().map(|p| &p.line.subtotal))?;
        let (lines, reservations): (Vec<_>, Vec<_>) =
            priced.into_iter().map(|p| (p.line, p.reservations)).unzip();

        let now = Utc::now();
        let mut booking = Booking {
            id: Uuid::new_v4().to_string(),
            reference: Booking::generate_reference(),
            user_id: user.sub.clone(),
            customer,
            lines,
            reservations: reservations.into_iter().flatten().collect(),
            total,
            currency: self.policy.currency.clone(),
            state: BookingState::INITIAL,
            version: 0,
            refunded_amount: Decimal::ZERO,
            refund_ids: Vec::new(),
            notes: req.notes,
            created_utc: now,
            updated_utc: now,
            confirmed_utc: None,
            completed_utc: None,
            cancelled_utc: None,
        };

        if let Err(e) = insert_booking(self.store.as_ref(), &mut booking).await {
            if matches!(e, RentalError::InsufficientAvailability { .. }) {
                metrics::record_availability_rejection();
                tracing::info!(user_id = %user.sub, error = %e, "Booking rejected");
            }
            return Err(e);
        }

        metrics::record_booking_created(&booking.currency);
        tracing::info!(
            booking_id = %booking.id,
            reference = %booking.reference,
            user_id = %booking.user_id,
            total = %booking.total,
            "Booking created"
        );

        self.notifier
            .notify_admins(
                NotificationKind::BookingCreated,
                "New booking",
                format!(
                    "{} booked {} for {} {}",
                    booking.customer.name, booking.reference, booking.total, booking.currency
                ),
                Some(&booking.id),
            )
            .await;
        email::send_quietly(self.email.as_ref(), email::booking_confirmation(&booking)).await;

        Ok(booking)
    }

    pub async fn get(&self, id: &str) -> Result<Booking, RentalError> {
        self.store
            .find_booking(id)
            .await?
            .ok_or_else(|| RentalError::not_found("booking", id))
    }

    pub async fn get_for(&self, user: &AccessTokenClaims, id: &str) -> Result<Booking, RentalError> {
        let booking = self.get(id).await?;
        ensure_can_access(user, &booking)?;
        Ok(booking)
    }

    pub async fn get_by_reference(
        &self,
        user: &AccessTokenClaims,
        reference: &str,
    ) -> Result<Booking, RentalError> {
        let booking = self
            .store
            .find_booking_by_reference(reference)
            .await?
            .ok_or_else(|| RentalError::not_found("booking", reference))?;
        ensure_can_access(user, &booking)?;
        Ok(booking)
    }

    /// Admins see every booking; customers only their own.
    pub async fn list(
        &self,
        user: &AccessTokenClaims,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, RentalError> {
        let filter = BookingFilter {
            user_id: (!user.is_admin()).then(|| user.sub.clone()),
            status,
        };
        self.store.list_bookings(&filter).await
    }

    pub async fn cancel(&self, user: &AccessTokenClaims, id: &str) -> Result<Booking, RentalError> {
        let booking = self.get_for(user, id).await?;
        let booking = transition_booking(self.store.as_ref(), booking, BookingEvent::Cancel).await?;

        self.notifier
            .notify_admins(
                NotificationKind::BookingCancelled,
                "Booking cancelled",
                format!("{} was cancelled", booking.reference),
                Some(&booking.id),
            )
            .await;
        Ok(booking)
    }

    pub async fn confirm(&self, id: &str) -> Result<Booking, RentalError> {
        let booking = self.get(id).await?;
        transition_booking(self.store.as_ref(), booking, BookingEvent::Confirm).await
    }

    pub async fn complete(&self, id: &str) -> Result<Booking, RentalError> {
        let booking = self.get(id).await?;
        transition_booking(self.store.as_ref(), booking, BookingEvent::Complete).await
    }

    pub async fn update(&self, id: &str, req: UpdateBookingRequest) -> Result<Booking, RentalError> {
        let mut booking = self.get(id).await?;

        if req.notes.is_some() {
            booking.notes = req.notes;
        }
        if let Some(name) = req.customer_name {
            booking.customer.name = name;
        }
        if let Some(email) = req.customer_email {
            booking.customer.email = email;
        }
        if req.customer_phone.is_some() {
            booking.customer.phone = req.customer_phone;
        }
        booking.updated_utc = Utc::now();

        save_booking(self.store.as_ref(), &mut booking).await?;
        tracing::info!(booking_id = %booking.id, "Booking details updated");
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn empty_booking(reference: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4().to_string(),
            reference: reference.to_string(),
            user_id: "u-1".to_string(),
            customer: Customer {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                phone: None,
            },
            lines: Vec::new(),
            reservations: Vec::new(),
            total: Decimal::ZERO,
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
    async fn taken_reference_is_redrawn() {
        let store = MemoryStore::new();
        store
            .insert_booking_checked(&empty_booking("BK-TAKEN001"))
            .await
            .unwrap();

        let mut booking = empty_booking("BK-TAKEN001");
        insert_booking(&store, &mut booking).await.unwrap();

        assert_ne!(booking.reference, "BK-TAKEN001");
        let stored = store
            .find_booking_by_reference(&booking.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, booking.id);
    }

    #[tokio::test]
    async fn other_insert_errors_are_not_retried() {
        let store = MemoryStore::new();
        let mut booking = empty_booking("BK-FIRST001");
        booking.reservations.push(Reservation {
            item_id: "missing".to_string(),
            quantity: 1,
            start_date: chrono::NaiveDate::from_ymd_opt(2031, 10, 10).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2031, 10, 12).unwrap(),
        });

        let err = insert_booking(&store, &mut booking).await.unwrap_err();
        assert!(matches!(err, RentalError::NotFound(_)));
        assert_eq!(booking.reference, "BK-FIRST001");
    }
}
