//! Notice board service.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::{NoticeId, NotificationType, UserId};

use super::notifications::NotificationService;
use super::{ServiceError, or_not_found};
use crate::db::notices::NoticeRepository;
use crate::db::users::UserRepository;
use crate::models::notice::Notice;
use crate::models::notification::NewNotification;
use crate::realtime::NotificationHub;

const NOTICE_NOT_FOUND: &str = "공지사항을 찾을 수 없습니다.";
const NOTICE_TITLE: &str = "📢 새로운 공지사항";

/// Body of a notice create or edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Display name of the author. Defaults to the admin's name.
    pub writer: Option<String>,
}

/// Notice service.
pub struct NoticeService<'a> {
    notices: NoticeRepository<'a>,
    users: UserRepository<'a>,
    notifications: NotificationService<'a>,
}

impl<'a> NoticeService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self {
            notices: NoticeRepository::new(pool),
            users: UserRepository::new(pool),
            notifications: NotificationService::new(pool, hub),
        }
    }

    /// Every notice, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Notice>, ServiceError> {
        Ok(self.notices.list(None, None).await?)
    }

    /// The newest `limit` notices.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Notice>, ServiceError> {
        Ok(self.notices.list(None, Some(limit.clamp(1, 100))).await?)
    }

    /// Keyword search over title and content.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<Notice>, ServiceError> {
        Ok(self.notices.list(keyword, None).await?)
    }

    /// One notice.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown notice.
    pub async fn get(&self, id: NoticeId) -> Result<Notice, ServiceError> {
        self.notices
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(NOTICE_NOT_FOUND))
    }

    /// Publish a notice and notify every eligible user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank title.
    #[instrument(skip(self, request))]
    pub async fn create(&self, admin_id: UserId, request: &NoticeRequest) -> Result<Notice, ServiceError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ServiceError::invalid("제목을 입력해주세요."));
        }

        let writer = match request.writer.as_deref().map(str::trim) {
            Some(writer) if !writer.is_empty() => writer.to_string(),
            _ => self
                .users
                .get_by_id(admin_id)
                .await?
                .map_or_else(|| "관리자".to_string(), |admin| admin.username),
        };

        let notice = self.notices.create(title, &writer, &request.content).await?;
        tracing::info!(notice_id = %notice.id, "Notice created");

        let notification = NewNotification::new(NotificationType::Notice, NOTICE_TITLE, notice.title.clone())
            .reference(notice.id.as_i32());
        if let Err(e) = self.notifications.notify_audience(notification).await {
            tracing::warn!(error = %e, notice_id = %notice.id, "Failed to send notice notifications");
        }

        Ok(notice)
    }

    /// Edit a notice.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank title and
    /// `ServiceError::NotFound` for an unknown notice.
    pub async fn update(&self, id: NoticeId, request: &NoticeRequest) -> Result<Notice, ServiceError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ServiceError::invalid("제목을 입력해주세요."));
        }
        self.notices
            .update(id, title, &request.content)
            .await
            .map_err(or_not_found(NOTICE_NOT_FOUND))
    }

    /// Delete a notice and its notifications.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown notice.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: NoticeId) -> Result<(), ServiceError> {
        self.notices
            .delete(id)
            .await
            .map_err(or_not_found(NOTICE_NOT_FOUND))?;
        let removed = self
            .notifications
            .forget_reference(&[NotificationType::Notice], id.as_i32())
            .await?;
        tracing::debug!(notice_id = %id, removed, "Notice notifications removed");
        Ok(())
    }
}
