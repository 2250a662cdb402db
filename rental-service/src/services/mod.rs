pub mod auth;
pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod email;
pub mod error;
pub mod invoices;
pub mod jwt;
pub mod metrics;
pub mod notifier;
pub mod payments;
pub mod refunds;

pub use auth::AuthService;
pub use bookings::BookingService;
pub use catalog::CatalogService;
pub use email::{EmailProvider, LogEmailService, MockEmailService, SmtpEmailService};
pub use error::RentalError;
pub use invoices::InvoiceService;
pub use jwt::{AccessTokenClaims, JwtService, TokenResponse};
pub use metrics::{get_metrics, init_metrics};
pub use notifier::Notifier;
pub use payments::PaymentService;
pub use refunds::RefundService;
