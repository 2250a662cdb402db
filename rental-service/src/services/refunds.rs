use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::{ApproveRefundRequest, CreateRefundRequest, NoteRequest};
use crate::models::{
    Booking, BookingEvent, NotificationKind, PaymentState, Refund, RefundStatus,
};
use crate::services::bookings::{ensure_can_access, save_booking};
use crate::services::email::{self, EmailProvider};
use crate::services::{metrics, AccessTokenClaims, Notifier, RentalError};
use crate::store::RentalStore;

#[derive(Clone)]
pub struct RefundService {
    store: Arc<dyn RentalStore>,
    notifier: Notifier,
    email: Arc<dyn EmailProvider>,
}

impl RefundService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        notifier: Notifier,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        Self {
            store,
            notifier,
            email,
        }
    }

    async fn booking(&self, id: &str) -> Result<Booking, RentalError> {
        self.store
            .find_booking(id)
            .await?
            .ok_or_else(|| RentalError::not_found("booking", id))
    }

    async fn get(&self, id: &str) -> Result<Refund, RentalError> {
        self.store
            .find_refund(id)
            .await?
            .ok_or_else(|| RentalError::not_found("refund", id))
    }

    async fn save(&self, refund: &Refund, expected: RefundStatus) -> Result<(), RentalError> {
        if !self.store.replace_refund_if(refund, expected).await? {
            return Err(RentalError::Conflict(format!(
                "refund {} was modified concurrently",
                refund.id
            )));
        }
        metrics::record_refund(refund.status.as_str());
        tracing::info!(
            refund_id = %refund.id,
            booking_id = %refund.booking_id,
            from = expected.as_str(),
            to = refund.status.as_str(),
            "Refund status changed"
        );
        Ok(())
    }

    /// Amount still open to new refund requests: the booking total less what has been
    /// refunded and what pending or approved requests already claim.
    async fn unclaimed_amount(&self, booking: &Booking) -> Result<Decimal, RentalError> {
        let claimed: Decimal = self
            .store
            .list_refunds_for_booking(&booking.id)
            .await?
            .iter()
            .map(Refund::claimed_amount)
            .sum();
        Ok((booking.refundable_amount() - claimed).max(Decimal::ZERO))
    }

    pub async fn request(
        &self,
        user: &AccessTokenClaims,
        req: CreateRefundRequest,
    ) -> Result<Refund, RentalError> {
        let booking = self.booking(&req.booking_id).await?;
        ensure_can_access(user, &booking)?;

        if booking.state.payment != PaymentState::Completed {
            return Err(RentalError::Validation(format!(
                "booking {} has no completed payment to refund",
                booking.reference
            )));
        }

        let available = self.unclaimed_amount(&booking).await?;
        if req.amount <= Decimal::ZERO || req.amount > available {
            return Err(RentalError::Validation(format!(
                "refund amount {} must be positive and at most {}",
                req.amount, available
            )));
        }

        let now = Utc::now();
        let refund = Refund {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            booking_reference: booking.reference.clone(),
            user_id: booking.user_id.clone(),
            requested_amount: req.amount,
            approved_amount: None,
            currency: booking.currency.clone(),
            reason: req.reason,
            status: RefundStatus::Pending,
            admin_note: None,
            created_utc: now,
            updated_utc: now,
            decided_utc: None,
            processed_utc: None,
            cancelled_utc: None,
        };
        self.store.insert_refund(&refund).await?;
        metrics::record_refund(refund.status.as_str());
        tracing::info!(
            refund_id = %refund.id,
            booking_id = %booking.id,
            amount = %refund.requested_amount,
            "Refund requested"
        );

        self.notifier
            .notify_admins(
                NotificationKind::RefundRequested,
                "Refund requested",
                format!(
                    "Refund of {} {} requested for {}: {}",
                    refund.requested_amount, refund.currency, booking.reference, refund.reason
                ),
                Some(&booking.id),
            )
            .await;

        Ok(refund)
    }

    pub async fn approve(&self, id: &str, req: ApproveRefundRequest) -> Result<Refund, RentalError> {
        let mut refund = self.get(id).await?;
        let expected = refund.status;
        refund.approve(req.amount, req.note, Utc::now())?;
        self.save(&refund, expected).await?;
        Ok(refund)
    }

    pub async fn reject(&self, id: &str, req: NoteRequest) -> Result<Refund, RentalError> {
        let mut refund = self.get(id).await?;
        let expected = refund.status;
        refund.reject(req.note, Utc::now())?;
        self.save(&refund, expected).await?;
        Ok(refund)
    }

    /// Record the approved amount as paid back and settle the booking once fully refunded.
    /// The booking is saved first and remembers the refund id, so a retry never counts it twice.
    pub async fn process(&self, id: &str) -> Result<Refund, RentalError> {
        let mut refund = self.get(id).await?;
        let expected = refund.status;
        let now = Utc::now();
        let amount = refund.process(now)?;

        let mut booking = self.booking(&refund.booking_id).await?;
        if !booking.refund_ids.contains(&refund.id) {
            // Every payout needs a completed payment, full or partial.
            let refunded = booking.next_state(BookingEvent::RefundProcessed, now.date_naive())?;
            if amount > booking.refundable_amount() {
                return Err(RentalError::Validation(format!(
                    "refund amount {} exceeds the {} still refundable on {}",
                    amount,
                    booking.refundable_amount(),
                    booking.reference
                )));
            }

            let from = booking.state;
            booking.refunded_amount += amount;
            if booking.refunded_amount >= booking.total {
                booking.enter(refunded, now);
            }
            booking.refund_ids.push(refund.id.clone());
            booking.updated_utc = now;
            save_booking(self.store.as_ref(), &mut booking).await?;

            if booking.state != from {
                tracing::info!(
                    booking_id = %booking.id,
                    reference = %booking.reference,
                    event = ?BookingEvent::RefundProcessed,
                    from = %from,
                    to = %booking.state,
                    "Booking state changed"
                );
            }
        }

        self.save(&refund, expected).await?;

        tracing::info!(
            refund_id = %refund.id,
            booking_id = %booking.id,
            amount = %amount,
            refunded_total = %booking.refunded_amount,
            "Refund processed"
        );
        email::send_quietly(
            self.email.as_ref(),
            email::refund_processed(&booking, &refund, amount),
        )
        .await;

        Ok(refund)
    }

    pub async fn cancel(&self, user: &AccessTokenClaims, id: &str) -> Result<Refund, RentalError> {
        let mut refund = self.get_for(user, id).await?;
        let expected = refund.status;
        refund.cancel(Utc::now())?;
        self.save(&refund, expected).await?;
        Ok(refund)
    }

    pub async fn get_for(&self, user: &AccessTokenClaims, id: &str) -> Result<Refund, RentalError> {
        let refund = self.get(id).await?;
        if !user.is_admin() && refund.user_id != user.sub {
            return Err(RentalError::Forbidden(
                "You do not have access to this refund".to_string(),
            ));
        }
        Ok(refund)
    }

    pub async fn list(&self, user: &AccessTokenClaims) -> Result<Vec<Refund>, RentalError> {
        let owner = (!user.is_admin()).then_some(user.sub.as_str());
        self.store.list_refunds(owner).await
    }
}
