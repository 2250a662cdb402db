//! Refund requests and their review workflow.
//!
//! ```text
//! pending ──approve──> approved ──process──> processed
//!    │ ╲
//!    │  ╲──reject──> rejected
//!    └──cancel──> cancelled
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
    Cancelled,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Approved => "approved",
            RefundStatus::Rejected => "rejected",
            RefundStatus::Processed => "processed",
            RefundStatus::Cancelled => "cancelled",
        }
    }

    /// Refunds that still claim part of the booking total.
    pub fn is_open(&self) -> bool {
        matches!(self, RefundStatus::Pending | RefundStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefundError {
    #[error("refund is {actual}, expected {expected}")]
    WrongStatus {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("approved amount {approved} must be positive and at most the requested {requested}")]
    InvalidApprovedAmount {
        approved: Decimal,
        requested: Decimal,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    #[serde(rename = "_id")]
    pub id: String,
    pub booking_id: String,
    pub booking_reference: String,
    pub user_id: String,
    pub requested_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_amount: Option<Decimal>,
    pub currency: String,
    pub reason: String,
    pub status: RefundStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_utc: Option<DateTime<Utc>>,
}

impl Refund {
    fn expect_status(&self, expected: RefundStatus) -> Result<(), RefundError> {
        if self.status != expected {
            return Err(RefundError::WrongStatus {
                expected: expected.as_str(),
                actual: self.status.as_str(),
            });
        }
        Ok(())
    }

    /// Approve for `amount`, or the full requested amount when `None`.
    pub fn approve(
        &mut self,
        amount: Option<Decimal>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), RefundError> {
        self.expect_status(RefundStatus::Pending)?;
        let approved = amount.unwrap_or(self.requested_amount);
        if approved <= Decimal::ZERO || approved > self.requested_amount {
            return Err(RefundError::InvalidApprovedAmount {
                approved,
                requested: self.requested_amount,
            });
        }
        self.status = RefundStatus::Approved;
        self.approved_amount = Some(approved);
        if note.is_some() {
            self.admin_note = note;
        }
        self.decided_utc = Some(now);
        self.updated_utc = now;
        Ok(())
    }

    pub fn reject(&mut self, note: Option<String>, now: DateTime<Utc>) -> Result<(), RefundError> {
        self.expect_status(RefundStatus::Pending)?;
        self.status = RefundStatus::Rejected;
        if note.is_some() {
            self.admin_note = note;
        }
        self.decided_utc = Some(now);
        self.updated_utc = now;
        Ok(())
    }

    /// Marks the money as sent back. Returns the amount refunded.
    pub fn process(&mut self, now: DateTime<Utc>) -> Result<Decimal, RefundError> {
        self.expect_status(RefundStatus::Approved)?;
        let amount = self.approved_amount.unwrap_or(self.requested_amount);
        self.status = RefundStatus::Processed;
        self.processed_utc = Some(now);
        self.updated_utc = now;
        Ok(amount)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), RefundError> {
        self.expect_status(RefundStatus::Pending)?;
        self.status = RefundStatus::Cancelled;
        self.cancelled_utc = Some(now);
        self.updated_utc = now;
        Ok(())
    }

    /// Amount this refund holds against the booking total while open.
    pub fn claimed_amount(&self) -> Decimal {
        match self.status {
            RefundStatus::Pending => self.requested_amount,
            RefundStatus::Approved => self.approved_amount.unwrap_or(self.requested_amount),
            _ => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(amount: Decimal) -> Refund {
        let now = Utc::now();
        Refund {
            id: "r-1".to_string(),
            booking_id: "b-1".to_string(),
            booking_reference: "BK-TEST0001".to_string(),
            user_id: "u-1".to_string(),
            requested_amount: amount,
            approved_amount: None,
            currency: "INR".to_string(),
            reason: "shoot postponed".to_string(),
            status: RefundStatus::Pending,
            admin_note: None,
            created_utc: now,
            updated_utc: now,
            decided_utc: None,
            processed_utc: None,
            cancelled_utc: None,
        }
    }

    #[test]
    fn approve_defaults_to_requested_amount() {
        let mut r = pending(Decimal::from(1500));
        r.approve(None, None, Utc::now()).unwrap();
        assert_eq!(r.status, RefundStatus::Approved);
        assert_eq!(r.approved_amount, Some(Decimal::from(1500)));
    }

    #[test]
    fn approve_rejects_amount_over_request() {
        let mut r = pending(Decimal::from(1500));
        let err = r.approve(Some(Decimal::new(150001, 2)), None, Utc::now()).unwrap_err();
        assert!(matches!(err, RefundError::InvalidApprovedAmount { .. }));
        assert!(r.approve(Some(Decimal::ZERO), None, Utc::now()).is_err());
        assert_eq!(r.status, RefundStatus::Pending);
    }

    #[test]
    fn cannot_process_without_approval() {
        let mut r = pending(Decimal::from(100));
        assert_eq!(
            r.process(Utc::now()),
            Err(RefundError::WrongStatus {
                expected: "approved",
                actual: "pending"
            })
        );

        r.approve(Some(Decimal::from(60)), Some("partial".to_string()), Utc::now())
            .unwrap();
        assert_eq!(r.process(Utc::now()), Ok(Decimal::from(60)));
        assert_eq!(r.status, RefundStatus::Processed);
        assert!(r.process(Utc::now()).is_err());
    }

    #[test]
    fn only_pending_refunds_can_be_cancelled_or_rejected() {
        let mut r = pending(Decimal::from(100));
        r.reject(Some("outside policy".to_string()), Utc::now())
            .unwrap();
        assert!(r.cancel(Utc::now()).is_err());
        assert!(r.approve(None, None, Utc::now()).is_err());

        let mut r = pending(Decimal::from(100));
        r.cancel(Utc::now()).unwrap();
        assert_eq!(r.status, RefundStatus::Cancelled);
        assert_eq!(r.claimed_amount(), Decimal::ZERO);
    }
}
