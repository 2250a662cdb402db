mod auth;
mod billing;
mod bookings;
mod catalog;
mod responses;

pub use auth::*;
pub use billing::*;
pub use bookings::*;
pub use catalog::*;
pub use responses::*;

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive_amount"));
    }
    Ok(())
}
