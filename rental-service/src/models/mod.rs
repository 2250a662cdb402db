//! Domain models for rental-service.

mod booking;
mod date_range;
mod inventory;
mod invoice;
mod notification;
mod package;
mod payment;
mod refund;
mod user;

pub use booking::{
    Booking, BookingEvent, BookingLine, BookingState, BookingStatus, Customer, LineTarget,
    PaymentState, Reservation, TransitionError,
};
pub use date_range::{DateRange, DateRangeError};
pub use inventory::{InventoryItem, ItemCategory, ItemStatus};
pub use invoice::{Invoice, InvoiceLine};
pub use notification::{Notification, NotificationKind};
pub use package::{Package, PackageComponent};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use refund::{Refund, RefundError, RefundStatus};
pub use user::{Role, User};
