use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::CreatePaymentRequest;
use crate::models::{
    Booking, BookingEvent, NotificationKind, Payment, PaymentMethod, PaymentState, PaymentStatus,
};
use crate::services::bookings::{ensure_can_access, transition_booking};
use crate::services::email::{self, EmailProvider};
use crate::services::{metrics, AccessTokenClaims, Notifier, RentalError};
use crate::store::RentalStore;

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn RentalStore>,
    notifier: Notifier,
    email: Arc<dyn EmailProvider>,
}

impl PaymentService {
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

    pub async fn get(&self, id: &str) -> Result<Payment, RentalError> {
        self.store
            .find_payment(id)
            .await?
            .ok_or_else(|| RentalError::not_found("payment", id))
    }

    /// Record a payment for the full booking total.
    ///
    /// Card payments arrive already authorised and complete immediately. Cash and bank
    /// transfers stay pending until an admin confirms the money arrived.
    pub async fn process_payment(
        &self,
        user: &AccessTokenClaims,
        req: CreatePaymentRequest,
    ) -> Result<Payment, RentalError> {
        let booking = self.booking(&req.booking_id).await?;
        ensure_can_access(user, &booking)?;

        // The booking must be able to accept a completed payment at all.
        booking.state.apply(BookingEvent::PaymentCompleted)?;

        if req.amount != booking.total {
            return Err(RentalError::Validation(format!(
                "payment amount {} must equal the booking total {}",
                req.amount, booking.total
            )));
        }
        if req.method == PaymentMethod::Card && req.transaction_id.is_none() {
            return Err(RentalError::Validation(
                "card payments require a transaction_id".to_string(),
            ));
        }

        let open = self.store.list_payments_for_booking(&booking.id).await?;
        if open.iter().any(|p| p.status != PaymentStatus::Failed) {
            return Err(RentalError::Conflict(format!(
                "booking {} already has a pending or completed payment",
                booking.reference
            )));
        }

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            user_id: booking.user_id.clone(),
            method: req.method,
            transaction_id: req.transaction_id,
            amount: req.amount,
            currency: booking.currency.clone(),
            status: PaymentStatus::Pending,
            note: req.note,
            created_utc: now,
            updated_utc: now,
            completed_utc: None,
            failed_utc: None,
        };
        self.store.insert_payment(&payment).await?;
        tracing::info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            method = payment.method.as_str(),
            amount = %payment.amount,
            "Payment recorded"
        );

        if !payment.method.settles_immediately() {
            metrics::record_payment(payment.method.as_str(), PaymentStatus::Pending.as_str());
            return Ok(payment);
        }

        match self
            .settle(payment.clone(), PaymentStatus::Completed, None)
            .await
        {
            Ok(settled) => Ok(settled),
            Err(e) => {
                // Leave no pending card payment behind for a booking that refused it.
                let mut failed = payment;
                failed.set_status(PaymentStatus::Failed, Utc::now());
                failed.note = Some(format!("not applied to booking: {}", e));
                if let Err(store_err) = self
                    .store
                    .replace_payment_if(&failed, PaymentStatus::Pending)
                    .await
                {
                    tracing::error!(payment_id = %failed.id, error = %store_err, "Failed to mark payment failed");
                }
                Err(e)
            }
        }
    }

    pub async fn complete_payment(&self, id: &str) -> Result<Payment, RentalError> {
        let payment = self.get(id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(RentalError::Conflict(format!(
                "payment {} is {}, not pending",
                payment.id,
                payment.status.as_str()
            )));
        }
        self.settle(payment, PaymentStatus::Completed, None).await
    }

    pub async fn fail_payment(&self, id: &str, note: Option<String>) -> Result<Payment, RentalError> {
        let payment = self.get(id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(RentalError::Conflict(format!(
                "payment {} is {}, not pending",
                payment.id,
                payment.status.as_str()
            )));
        }
        self.settle(payment, PaymentStatus::Failed, note).await
    }

    /// Admin override; the only way to change a completed payment.
    pub async fn correct_status(
        &self,
        id: &str,
        status: PaymentStatus,
        note: Option<String>,
    ) -> Result<Payment, RentalError> {
        let payment = self.get(id).await?;
        self.settle(payment, status, note).await
    }

    /// Move `payment` to `status`, carrying the booking along.
    async fn settle(
        &self,
        mut payment: Payment,
        status: PaymentStatus,
        note: Option<String>,
    ) -> Result<Payment, RentalError> {
        let event = match (payment.status, status) {
            (from, to) if from == to => return Ok(payment),
            (_, PaymentStatus::Pending) => {
                return Err(RentalError::Validation(
                    "a payment cannot be moved back to pending".to_string(),
                ))
            }
            (_, PaymentStatus::Completed) => BookingEvent::PaymentCompleted,
            (PaymentStatus::Completed, PaymentStatus::Failed) => BookingEvent::PaymentReversed,
            (_, PaymentStatus::Failed) => BookingEvent::PaymentFailed,
        };

        let booking = self.booking(&payment.booking_id).await?;
        let booking = if event == BookingEvent::PaymentFailed
            && booking.state.payment == PaymentState::Failed
        {
            booking
        } else {
            transition_booking(self.store.as_ref(), booking, event).await?
        };

        let expected = payment.status;
        payment.set_status(status, Utc::now());
        if note.is_some() {
            payment.note = note;
        }
        if !self.store.replace_payment_if(&payment, expected).await? {
            return Err(RentalError::Conflict(format!(
                "payment {} was modified concurrently",
                payment.id
            )));
        }

        metrics::record_payment(payment.method.as_str(), status.as_str());
        tracing::info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            from = expected.as_str(),
            to = status.as_str(),
            "Payment status changed"
        );

        match status {
            PaymentStatus::Completed => {
                self.notifier
                    .notify_admins(
                        NotificationKind::PaymentReceived,
                        "Payment received",
                        format!(
                            "{} {} received for {} via {}",
                            payment.amount,
                            payment.currency,
                            booking.reference,
                            payment.method.as_str()
                        ),
                        Some(&booking.id),
                    )
                    .await;
                email::send_quietly(self.email.as_ref(), email::payment_receipt(&booking, &payment))
                    .await;
            }
            PaymentStatus::Failed => {
                self.notifier
                    .notify_admins(
                        NotificationKind::PaymentFailed,
                        "Payment failed",
                        format!("Payment {} for {} failed", payment.id, booking.reference),
                        Some(&booking.id),
                    )
                    .await;
            }
            PaymentStatus::Pending => {}
        }

        Ok(payment)
    }

    pub async fn list_for_booking(
        &self,
        user: &AccessTokenClaims,
        booking_id: &str,
    ) -> Result<Vec<Payment>, RentalError> {
        let booking = self.booking(booking_id).await?;
        ensure_can_access(user, &booking)?;
        self.store.list_payments_for_booking(&booking.id).await
    }
}
