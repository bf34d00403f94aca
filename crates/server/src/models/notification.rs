//! Stored notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::{NotificationId, NotificationType, ProductId, UserId};

/// A notification row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub product_id: Option<ProductId>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: NotificationType,
    pub reference_id: Option<i32>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Content of a notification about to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationType,
    pub title: String,
    pub content: String,
    pub reference_id: Option<i32>,
    pub product_id: Option<ProductId>,
}

impl NewNotification {
    pub fn new(kind: NotificationType, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            content: content.into(),
            reference_id: None,
            product_id: None,
        }
    }

    #[must_use]
    pub const fn reference(mut self, id: i32) -> Self {
        self.reference_id = Some(id);
        self
    }

    #[must_use]
    pub const fn product(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }
}
