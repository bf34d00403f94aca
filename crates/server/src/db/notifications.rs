//! Notification repository.

use sqlx::PgPool;

use onandhome_core::{NotificationId, NotificationType, ProductId, UserId};

use super::RepositoryError;
use crate::models::notification::{NewNotification, Notification};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, content, product_id, type, reference_id, is_read, created_at, read_at";

/// Repository for notification database operations.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a notification for one user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        user_id: UserId,
        notification: &NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let row = sqlx::query_as::<_, Notification>(&format!(
            r"
            INSERT INTO notifications (user_id, title, content, product_id, type, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTIFICATION_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.product_id)
        .bind(notification.kind)
        .bind(notification.reference_id)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Store the same notification for many users in one statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_many(
        &self,
        user_ids: &[UserId],
        notification: &NewNotification,
    ) -> Result<u64, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r"
            INSERT INTO notifications (user_id, title, content, product_id, type, reference_id)
            SELECT recipient, $2, $3, $4, $5, $6 FROM UNNEST($1::INTEGER[]) AS recipient
            ",
        )
        .bind(user_ids)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.product_id)
        .bind(notification.kind)
        .bind(notification.reference_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            r"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of unread notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one of the user's notifications read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such notification.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark every unread notification read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete one of the user's notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such notification.
    pub async fn delete(&self, user_id: UserId, id: NotificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete every notification of the given kinds pointing at `reference_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_by_reference(
        &self,
        kinds: &[NotificationType],
        reference_id: i32,
    ) -> Result<u64, RepositoryError> {
        let names: Vec<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
        let result = sqlx::query(
            "DELETE FROM notifications WHERE type::TEXT = ANY($1) AND reference_id = $2",
        )
        .bind(&names)
        .bind(reference_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every notification about a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_by_product(&self, product_id: ProductId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE product_id = $1")
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
