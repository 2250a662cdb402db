//! Customer email: booking confirmations, payment receipts and refund notices.
//!
//! Delivery is best effort. Callers go through [`send_quietly`], which logs failures and
//! never propagates them into the booking, payment or refund that triggered the email.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::models::{Booking, Payment, Refund};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, port = config.port, "SMTP email service initialized");

        Ok(Self {
            mailer,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Used when SMTP is disabled; logs instead of sending.
pub struct LogEmailService;

#[async_trait]
impl EmailProvider for LogEmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        tracing::info!(to = %email.to, subject = %email.subject, "SMTP disabled, email not sent");
        Ok(())
    }
}

/// Records every message; optionally fails every send.
#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::EmailError("mock SMTP unavailable".to_string()));
        }
        self.sent
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock mailer mutex poisoned: {}", e)))?
            .push(email.clone());
        Ok(())
    }
}

/// Send and log the outcome; email trouble never fails the caller.
pub async fn send_quietly(provider: &dyn EmailProvider, email: OutgoingEmail) {
    if let Err(e) = provider.send(&email).await {
        tracing::warn!(error = %e, to = %email.to, subject = %email.subject, "Failed to send email");
    }
}

pub fn booking_confirmation(booking: &Booking) -> OutgoingEmail {
    let mut body = format!(
        "Hi {},\n\nThanks for your booking. Your reference is {}.\n\n",
        booking.customer.name, booking.reference
    );
    for line in &booking.lines {
        body.push_str(&format!(
            "- {} x{}: {} to {} ({} days) {} {}\n",
            line.name,
            line.quantity,
            line.start_date,
            line.end_date,
            line.days,
            line.subtotal,
            booking.currency
        ));
    }
    body.push_str(&format!("\nTotal: {} {}\n", booking.total, booking.currency));

    OutgoingEmail {
        to: booking.customer.email.clone(),
        subject: format!("Booking {} received", booking.reference),
        body,
    }
}

pub fn payment_receipt(booking: &Booking, payment: &Payment) -> OutgoingEmail {
    OutgoingEmail {
        to: booking.customer.email.clone(),
        subject: format!("Payment received for booking {}", booking.reference),
        body: format!(
            "Hi {},\n\nWe received your {} payment of {} {} for booking {}.\nPayment id: {}\n",
            booking.customer.name,
            payment.method.as_str(),
            payment.amount,
            payment.currency,
            booking.reference,
            payment.id
        ),
    }
}

pub fn refund_processed(booking: &Booking, refund: &Refund, amount: rust_decimal::Decimal) -> OutgoingEmail {
    OutgoingEmail {
        to: booking.customer.email.clone(),
        subject: format!("Refund processed for booking {}", booking.reference),
        body: format!(
            "Hi {},\n\nYour refund of {} {} for booking {} has been processed.\nRefund id: {}\n",
            booking.customer.name, amount, refund.currency, booking.reference, refund.id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "asha@example.com".to_string(),
            subject: "Booking BK-TEST0001 received".to_string(),
            body: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn mock_records_sent_messages() {
        let mock = MockEmailService::new();
        send_quietly(&mock, email()).await;
        assert_eq!(mock.sent(), vec![email()]);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let mock = MockEmailService::failing();
        send_quietly(&mock, email()).await;
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn smtp_service_builds_without_connecting() {
        let config = SmtpConfig {
            enabled: true,
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "bookings".to_string(),
            password: secrecy::Secret::new("pw".to_string()),
            from: "Studio <bookings@example.com>".to_string(),
        };
        assert!(SmtpEmailService::new(&config).is_ok());
    }
}
