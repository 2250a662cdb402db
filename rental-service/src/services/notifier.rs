use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Notification, NotificationKind};
use crate::services::RentalError;
use crate::store::RentalStore;

/// Admin inbox. Each event is fanned out to one notification per admin.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn RentalStore>,
}

impl Notifier {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    /// Best effort: a failure is logged and otherwise ignored.
    pub async fn notify_admins(
        &self,
        kind: NotificationKind,
        title: &str,
        message: String,
        booking_id: Option<&str>,
    ) {
        if let Err(e) = self.try_notify(kind, title, message, booking_id).await {
            tracing::warn!(error = %e, kind = ?kind, "Failed to create admin notifications");
        }
    }

    async fn try_notify(
        &self,
        kind: NotificationKind,
        title: &str,
        message: String,
        booking_id: Option<&str>,
    ) -> Result<(), RentalError> {
        let now = Utc::now();
        let notifications: Vec<Notification> = self
            .store
            .list_admins()
            .await?
            .into_iter()
            .map(|admin| Notification {
                id: Uuid::new_v4().to_string(),
                admin_id: admin.id,
                kind,
                title: title.to_string(),
                message: message.clone(),
                booking_id: booking_id.map(str::to_string),
                read: false,
                read_utc: None,
                created_utc: now,
            })
            .collect();

        self.store.insert_notifications(&notifications).await?;
        tracing::debug!(kind = ?kind, count = notifications.len(), "Admin notifications created");
        Ok(())
    }

    pub async fn list(
        &self,
        admin_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RentalError> {
        self.store.list_notifications(admin_id, unread_only).await
    }

    pub async fn unread_count(&self, admin_id: &str) -> Result<u64, RentalError> {
        self.store.count_unread(admin_id).await
    }

    pub async fn mark_read(
        &self,
        id: &str,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Notification, RentalError> {
        self.store
            .mark_notification_read(id, admin_id, now)
            .await?
            .ok_or_else(|| RentalError::not_found("notification", id))
    }

    pub async fn mark_all_read(&self, admin_id: &str, now: DateTime<Utc>) -> Result<u64, RentalError> {
        let changed = self.store.mark_all_read(admin_id, now).await?;
        tracing::info!(admin_id = %admin_id, changed, "Notifications marked read");
        Ok(changed)
    }
}
