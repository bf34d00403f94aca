//! Notification storage and push.
//!
//! Every notification is stored first and pushed second. A failed push
//! (nobody connected) is logged and never turns into an error.

use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::{NotificationId, NotificationType, UserId};

use super::ServiceError;
use crate::db::notifications::NotificationRepository;
use crate::db::users::UserRepository;
use crate::models::notification::{NewNotification, Notification};
use crate::models::user::User;
use crate::realtime::{NotificationHub, PushMessage};

/// Notification service.
pub struct NotificationService<'a> {
    notifications: NotificationRepository<'a>,
    users: UserRepository<'a>,
    hub: &'a NotificationHub,
}

impl<'a> NotificationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self {
            notifications: NotificationRepository::new(pool),
            users: UserRepository::new(pool),
            hub,
        }
    }

    /// Store and push a notification for one user, if the type is deliverable.
    ///
    /// Returns the stored row, or `None` when the recipient may not receive
    /// this type.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storing fails.
    #[instrument(skip(self, recipient, notification, push), fields(recipient = %recipient.user_id, kind = %notification.kind))]
    pub async fn notify_user(
        &self,
        recipient: &User,
        notification: NewNotification,
        push: Option<PushMessage>,
    ) -> Result<Option<Notification>, ServiceError> {
        if !notification
            .kind
            .is_deliverable_to(&recipient.recipient_profile())
        {
            tracing::debug!("Recipient not eligible for notification type, skipped");
            return Ok(None);
        }

        let stored = self.notifications.insert(recipient.id, &notification).await?;
        let payload = push.unwrap_or_else(|| push_for(&notification));
        self.hub.send_to_user(&recipient.user_id, payload);
        Ok(Some(stored))
    }

    /// Store an admin-feed notification for every admin and push it to the
    /// admin topic once.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storing fails.
    #[instrument(skip(self, notification, push), fields(kind = %notification.kind))]
    pub async fn notify_admins(
        &self,
        notification: NewNotification,
        push: Option<PushMessage>,
    ) -> Result<u64, ServiceError> {
        let admins: Vec<UserId> = self
            .users
            .admins()
            .await?
            .iter()
            .filter(|admin| {
                notification
                    .kind
                    .is_deliverable_to(&admin.recipient_profile())
            })
            .map(|admin| admin.id)
            .collect();

        let stored = self
            .notifications
            .insert_many(&admins, &notification)
            .await?;
        let payload = push.unwrap_or_else(|| push_for(&notification));
        self.hub.send_to_admins(payload);
        Ok(stored)
    }

    /// Store a notification for every account in the type's bulk audience
    /// and push it to each of them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storing fails.
    #[instrument(skip(self, notification), fields(kind = %notification.kind))]
    pub async fn notify_audience(&self, notification: NewNotification) -> Result<u64, ServiceError> {
        let audience = notification.kind.bulk_audience();
        let recipients: Vec<User> = self
            .users
            .all()
            .await?
            .into_iter()
            .filter(|user| audience.includes(&user.recipient_profile()))
            .collect();

        let ids: Vec<UserId> = recipients.iter().map(|user| user.id).collect();
        let stored = self.notifications.insert_many(&ids, &notification).await?;

        let payload = push_for(&notification);
        for user in &recipients {
            self.hub.send_to_user(&user.user_id, payload.clone());
        }

        tracing::info!(recipients = stored, "Bulk notification sent");
        Ok(stored)
    }

    /// A user's notifications.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.notifications.list(user_id, unread_only).await?)
    }

    /// Unread count.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, ServiceError> {
        Ok(self.notifications.unread_count(user_id).await?)
    }

    /// Mark one notification read.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` unless the user owns the notification.
    pub async fn mark_read(&self, user_id: UserId, id: NotificationId) -> Result<(), ServiceError> {
        self.notifications
            .mark_read(user_id, id)
            .await
            .map_err(super::or_not_found("알림을 찾을 수 없습니다."))
    }

    /// Mark everything read.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, ServiceError> {
        Ok(self.notifications.mark_all_read(user_id).await?)
    }

    /// Delete one notification.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` unless the user owns the notification.
    pub async fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), ServiceError> {
        self.notifications
            .delete(user_id, id)
            .await
            .map_err(super::or_not_found("알림을 찾을 수 없습니다."))
    }

    /// Remove notifications of `kinds` that point at a deleted entity.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the delete fails.
    pub async fn forget_reference(
        &self,
        kinds: &[NotificationType],
        reference_id: i32,
    ) -> Result<u64, ServiceError> {
        Ok(self
            .notifications
            .delete_by_reference(kinds, reference_id)
            .await?)
    }
}

/// Default push payload mirroring a stored notification.
fn push_for(notification: &NewNotification) -> PushMessage {
    let mut push = PushMessage::new(
        notification.kind,
        notification.title.clone(),
        notification.content.clone(),
    );
    push.reference_id = notification.reference_id;
    push.product_id = notification.product_id;
    push
}

#[cfg(test)]
mod tests {
    use super::*;
    use onandhome_core::ProductId;

    #[test]
    fn test_push_mirrors_notification() {
        let notification = NewNotification::new(NotificationType::QnaReply, "답변 등록", "문의에 답변이 등록되었습니다.")
            .reference(4)
            .product(ProductId::new(8));
        let push = push_for(&notification);

        assert_eq!(push.kind, NotificationType::QnaReply);
        assert_eq!(push.message, "문의에 답변이 등록되었습니다.");
        assert_eq!(push.reference_id, Some(4));
        assert_eq!(push.product_id, Some(ProductId::new(8)));
        assert_eq!(push.order_id, None);
    }
}
