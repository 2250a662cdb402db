use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Booking, Invoice, InvoiceLine, PaymentState};
use crate::services::bookings::ensure_can_access;
use crate::services::{AccessTokenClaims, RentalError};
use crate::store::RentalStore;

const NUMBER_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn RentalStore>,
    due_days: u32,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn RentalStore>, due_days: u32) -> Self {
        Self { store, due_days }
    }

    fn build(&self, booking: &Booking) -> Invoice {
        let now = Utc::now();
        let issue_date = now.date_naive();
        let lines: Vec<InvoiceLine> = booking
            .lines
            .iter()
            .map(|l| InvoiceLine {
                description: format!("{} ({} to {})", l.name, l.start_date, l.end_date),
                quantity: l.quantity,
                days: l.days,
                unit_price: l.price_per_day,
                subtotal: l.subtotal,
            })
            .collect();
        let subtotal: Decimal = lines.iter().map(|l| l.subtotal).sum();

        Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: Invoice::generate_number(issue_date),
            booking_id: booking.id.clone(),
            booking_reference: booking.reference.clone(),
            user_id: booking.user_id.clone(),
            customer: booking.customer.clone(),
            lines,
            subtotal,
            total: booking.total,
            currency: booking.currency.clone(),
            issue_date,
            due_date: issue_date + Duration::days(i64::from(self.due_days)),
            payment_status: booking.state.payment,
            created_utc: now,
        }
    }

    /// Issue the invoice for a paid booking. Asking twice returns the first invoice.
    pub async fn create(
        &self,
        user: &AccessTokenClaims,
        booking_reference: &str,
    ) -> Result<Invoice, RentalError> {
        let booking = self
            .store
            .find_booking_by_reference(booking_reference)
            .await?
            .ok_or_else(|| RentalError::not_found("booking", booking_reference))?;
        ensure_can_access(user, &booking)?;

        if !matches!(
            booking.state.payment,
            PaymentState::Completed | PaymentState::Refunded
        ) {
            return Err(RentalError::Validation(format!(
                "booking {} must be paid before it can be invoiced",
                booking.reference
            )));
        }

        let mut attempt = 1;
        loop {
            let invoice = self.build(&booking);
            match self.store.insert_invoice_once(&invoice).await {
                Ok(stored) => {
                    if stored.id == invoice.id {
                        tracing::info!(
                            invoice_id = %stored.id,
                            invoice_number = %stored.invoice_number,
                            booking_id = %booking.id,
                            "Invoice issued"
                        );
                    }
                    return Ok(stored);
                }
                // Random invoice number collided; draw another.
                Err(RentalError::Conflict(_)) if attempt < NUMBER_ATTEMPTS => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get_for(&self, user: &AccessTokenClaims, id: &str) -> Result<Invoice, RentalError> {
        let invoice = self
            .store
            .find_invoice(id)
            .await?
            .ok_or_else(|| RentalError::not_found("invoice", id))?;
        if !user.is_admin() && invoice.user_id != user.sub {
            return Err(RentalError::Forbidden(
                "You do not have access to this invoice".to_string(),
            ));
        }
        Ok(invoice)
    }

    pub async fn get_by_booking_reference(
        &self,
        user: &AccessTokenClaims,
        reference: &str,
    ) -> Result<Invoice, RentalError> {
        let booking = self
            .store
            .find_booking_by_reference(reference)
            .await?
            .ok_or_else(|| RentalError::not_found("booking", reference))?;
        ensure_can_access(user, &booking)?;
        self.store
            .find_invoice_by_booking(&booking.id)
            .await?
            .ok_or_else(|| RentalError::not_found("invoice for booking", reference))
    }

    pub async fn list(&self) -> Result<Vec<Invoice>, RentalError> {
        self.store.list_invoices().await
    }
}
