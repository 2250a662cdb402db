use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingCreated,
    BookingCancelled,
    PaymentReceived,
    PaymentFailed,
    RefundRequested,
}

/// An admin inbox entry. Each admin gets their own copy, so read state is per admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub admin_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl Notification {
    /// Returns whether anything changed; a read notification stays as it was.
    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.read_utc = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn mark_read_is_idempotent() {
        let created = Utc::now();
        let mut n = Notification {
            id: "n-1".to_string(),
            admin_id: "admin-1".to_string(),
            kind: NotificationKind::BookingCreated,
            title: "New booking".to_string(),
            message: "BK-TEST0001".to_string(),
            booking_id: None,
            read: false,
            read_utc: None,
            created_utc: created,
        };

        let first = created + Duration::minutes(1);
        assert!(n.mark_read(first));
        assert!(!n.mark_read(first + Duration::minutes(5)));
        assert_eq!(n.read_utc, Some(first));
    }
}
