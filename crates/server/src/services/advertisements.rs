//! Advertisement service.

use sqlx::PgPool;
use tracing::instrument;

use onandhome_core::{AdvertisementId, NotificationType};

use super::notifications::NotificationService;
use super::{ServiceError, or_not_found};
use crate::db::advertisements::AdvertisementRepository;
use crate::models::advertisement::{Advertisement, AdvertisementInput};
use crate::models::notification::NewNotification;
use crate::realtime::NotificationHub;

const AD_NOT_FOUND: &str = "광고를 찾을 수 없습니다.";

/// Advertisement service.
pub struct AdvertisementService<'a> {
    ads: AdvertisementRepository<'a>,
    notifications: NotificationService<'a>,
}

fn validate(input: &AdvertisementInput) -> Result<(), ServiceError> {
    if input.title.trim().is_empty() {
        return Err(ServiceError::invalid("광고 제목을 입력해주세요."));
    }
    Ok(())
}

impl<'a> AdvertisementService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, hub: &'a NotificationHub) -> Self {
        Self {
            ads: AdvertisementRepository::new(pool),
            notifications: NotificationService::new(pool, hub),
        }
    }

    /// Every advertisement, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Advertisement>, ServiceError> {
        Ok(self.ads.list().await?)
    }

    /// One advertisement.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown advertisement.
    pub async fn get(&self, id: AdvertisementId) -> Result<Advertisement, ServiceError> {
        self.ads
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(AD_NOT_FOUND))
    }

    /// Create an advertisement.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank title.
    pub async fn create(&self, input: &AdvertisementInput) -> Result<Advertisement, ServiceError> {
        validate(input)?;
        Ok(self.ads.create(input).await?)
    }

    /// Replace an advertisement.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for a blank title and
    /// `ServiceError::NotFound` for an unknown advertisement.
    pub async fn update(
        &self,
        id: AdvertisementId,
        input: &AdvertisementInput,
    ) -> Result<Advertisement, ServiceError> {
        validate(input)?;
        self.ads
            .update(id, input)
            .await
            .map_err(or_not_found(AD_NOT_FOUND))
    }

    /// Delete an advertisement.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown advertisement.
    pub async fn delete(&self, id: AdvertisementId) -> Result<(), ServiceError> {
        self.ads
            .delete(id)
            .await
            .map_err(or_not_found(AD_NOT_FOUND))?;
        self.notifications
            .forget_reference(&[NotificationType::Advertisement], id.as_i32())
            .await?;
        Ok(())
    }

    /// Notify every consenting user and stamp `sent_at`.
    ///
    /// Returns the number of stored notifications.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for an inactive advertisement.
    #[instrument(skip(self))]
    pub async fn send(&self, id: AdvertisementId) -> Result<u64, ServiceError> {
        let ad = self.get(id).await?;
        if !ad.active {
            return Err(ServiceError::invalid("비활성화된 광고는 발송할 수 없습니다."));
        }

        let notification = NewNotification::new(
            NotificationType::Advertisement,
            ad.title.clone(),
            ad.content.clone().unwrap_or_default(),
        )
        .reference(id.as_i32());
        let sent = self.notifications.notify_audience(notification).await?;
        self.ads.mark_sent(id).await?;

        tracing::info!(advertisement_id = %id, recipients = sent, "Advertisement sent");
        Ok(sent)
    }
}
