use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half-open calendar range `[start, end)`: a booking ending on the 12th frees the
/// item for a booking starting on the 12th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("end date {end} must be after start date {start}")]
    EndNotAfterStart { start: NaiveDate, end: NaiveDate },

    #[error("rental of {days} days exceeds the maximum of {max} days")]
    TooLong { days: i64, max: u32 },
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end <= start {
            return Err(DateRangeError::EndNotAfterStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Like [`DateRange::new`] but also bounded by `max_days`.
    pub fn bounded(start: NaiveDate, end: NaiveDate, max_days: u32) -> Result<Self, DateRangeError> {
        let range = Self::new(start, end)?;
        let days = (end - start).num_days();
        if days > i64::from(max_days) {
            return Err(DateRangeError::TooLong {
                days,
                max: max_days,
            });
        }
        Ok(range)
    }

    /// Billable days, never less than one.
    pub fn days(&self) -> u32 {
        (self.end - self.start).num_days().max(1) as u32
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection with `other`, if any.
    pub fn clip(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(DateRange { start, end })
    }
}
