//! Bookings and their lifecycle.
//!
//! Booking status and payment status move together as one [`BookingState`]. Every write
//! goes through [`BookingState::apply`], which is the only place legal combinations are
//! defined.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether bookings in this status hold stock.
    pub fn reserves_stock(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingState {
    pub status: BookingStatus,
    pub payment: PaymentState,
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.status.as_str(), self.payment.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    Confirm,
    PaymentCompleted,
    PaymentFailed,
    /// Admin correction of a payment previously recorded as completed.
    PaymentReversed,
    Cancel,
    Complete,
    /// The refunded total reached the booking total.
    RefundProcessed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot apply {event:?} to a booking in state {from}")]
    NotAllowed {
        from: BookingState,
        event: BookingEvent,
    },

    #[error("rental runs until {ends}; it cannot be completed before then")]
    RentalNotEnded { ends: NaiveDate },
}

impl BookingState {
    pub const INITIAL: BookingState = BookingState {
        status: BookingStatus::Pending,
        payment: PaymentState::Pending,
    };

    /// The transition table.
    pub fn apply(self, event: BookingEvent) -> Result<BookingState, TransitionError> {
        use BookingEvent as E;
        use BookingStatus as S;
        use PaymentState as P;

        let (status, payment) = match (event, self.status, self.payment) {
            (E::Confirm, S::Pending, p) if p != P::Refunded => (S::Confirmed, p),
            (E::PaymentCompleted, S::Pending | S::Confirmed, P::Pending | P::Failed) => {
                (S::Confirmed, P::Completed)
            }
            (E::PaymentFailed, s @ (S::Pending | S::Confirmed | S::Cancelled), P::Pending) => {
                (s, P::Failed)
            }
            (E::PaymentReversed, s @ (S::Pending | S::Confirmed), P::Completed) => {
                (s, P::Failed)
            }
            (E::Cancel, S::Pending | S::Confirmed, p) if p != P::Refunded => (S::Cancelled, p),
            (E::Complete, S::Confirmed, P::Completed) => (S::Completed, P::Completed),
            (
                E::RefundProcessed,
                s @ (S::Confirmed | S::Completed | S::Cancelled),
                P::Completed,
            ) => (s, P::Refunded),
            _ => return Err(TransitionError::NotAllowed { from: self, event }),
        };

        Ok(BookingState { status, payment })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// What a booking line rents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineTarget {
    Item { item_id: String },
    Package { package_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingLine {
    pub target: LineTarget,
    pub name: String,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub price_per_day: Decimal,
    pub subtotal: Decimal,
}

impl BookingLine {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// Stock held on one inventory item; packages expand into one per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub item_id: String,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Reservation {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub reference: String,
    pub user_id: String,
    pub customer: Customer,
    pub lines: Vec<BookingLine>,
    pub reservations: Vec<Reservation>,
    pub total: Decimal,
    pub currency: String,
    pub state: BookingState,
    /// Bumped on every save; writes against a stale copy are refused.
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub refunded_amount: Decimal,
    /// Refunds already counted in `refunded_amount`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refund_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_utc: Option<DateTime<Utc>>,
}

impl Booking {
    /// Last day (exclusive) of any line.
    pub fn rental_end(&self) -> Option<NaiveDate> {
        self.lines.iter().map(|l| l.end_date).max()
    }

    pub fn refundable_amount(&self) -> Decimal {
        (self.total - self.refunded_amount).max(Decimal::ZERO)
    }

    /// Compute the state `event` leads to, without mutating.
    pub fn next_state(
        &self,
        event: BookingEvent,
        today: NaiveDate,
    ) -> Result<BookingState, TransitionError> {
        if event == BookingEvent::Complete {
            if let Some(ends) = self.rental_end() {
                if ends > today {
                    return Err(TransitionError::RentalNotEnded { ends });
                }
            }
        }
        self.state.apply(event)
    }

    /// Move to `next`, stamping the matching timestamp.
    pub fn enter(&mut self, next: BookingState, now: DateTime<Utc>) {
        if next.status != self.state.status {
            match next.status {
                BookingStatus::Confirmed => self.confirmed_utc = Some(now),
                BookingStatus::Completed => self.completed_utc = Some(now),
                BookingStatus::Cancelled => self.cancelled_utc = Some(now),
                BookingStatus::Pending => {}
            }
        }
        self.state = next;
        self.updated_utc = now;
    }

    pub fn generate_reference() -> String {
        const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
        let mut rng = rand::thread_rng();
        let code: String = (0..8)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        format!("BK-{}", code)
    }
}
